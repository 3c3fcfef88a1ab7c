//! Session construction and message pumping
//!
//! [`SessionSetup`] is a statum state machine that makes the construction order
//! a compile-time property: only a setup whose last will is registered can be
//! opened. [`SessionClient`] owns the single live session and rebuilds it from
//! the store's current state whenever the supervisor discards it.

use super::config::SessionConfig;
use super::{Connector, PubSub};
use crate::error::{SessionError, SessionFault};
use crate::indicator::{Fault, IndicatorDriver, OutputLine};
use crate::link::Link;
use crate::retry::FaultRetry;
use crate::state::{Applied, StateStore, TallyState, OFFLINE_PAYLOAD};
use rumqttc::{LastWill, MqttOptions, QoS};
use statum::{machine, state};
use tracing::{debug, info, warn};

#[state]
#[derive(Debug, Clone)]
pub enum SetupState {
    Unregistered,   // Options built, no last will yet
    WillRegistered, // Ready to open
}

#[machine]
#[derive(Debug)]
pub struct SessionSetup<S: SetupState> {
    options: MqttOptions,
    status_topic: String,
}

impl SessionSetup<Unregistered> {
    pub fn create(options: MqttOptions, status_topic: String) -> Self {
        Self::new(options, status_topic)
    }

    /// Declares `offline` as the retained, at-least-once last will on the status topic.
    pub fn register_will(mut self) -> SessionSetup<WillRegistered> {
        debug!("Registering last will on {}", self.status_topic);
        self.options.set_last_will(LastWill::new(
            self.status_topic.clone(),
            OFFLINE_PAYLOAD,
            QoS::AtLeastOnce,
            true,
        ));
        self.transition()
    }
}

impl SessionSetup<WillRegistered> {
    pub fn options(&self) -> &MqttOptions {
        &self.options
    }

    pub async fn open<C: Connector>(self, connector: &mut C) -> Result<C::Session, SessionError> {
        info!("Opening session for {}", self.status_topic);
        connector.open(self.options).await
    }
}

/// What one pump cycle did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    pub received: usize,
    pub changed: usize,
    pub republished: usize,
    pub rejected: usize,
}

pub struct SessionClient<C: Connector> {
    connector: C,
    config: SessionConfig,
    retry: FaultRetry,
    session: Option<C::Session>,
}

impl<C: Connector> SessionClient<C> {
    pub fn new(connector: C, config: SessionConfig) -> Self {
        let retry = FaultRetry::new(Fault::SessionDown, config.retry_cadence);
        Self {
            connector,
            config,
            retry,
            session: None,
        }
    }

    pub fn status_topic(&self) -> &str {
        &self.config.status_topic
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Drops the live session. It is never reused.
    pub fn discard(&mut self) {
        if self.session.take().is_some() {
            info!("Session on {} discarded", self.config.status_topic);
        }
    }

    /// Builds a brand-new session that announces `initial` once it is up.
    ///
    /// Open failures are retried at the session cadence with the
    /// `SessionDown` pattern. Gives up with [`SessionError::LinkLost`] when the
    /// link drops in between, so the link can be recovered first.
    pub async fn ensure_session<L: Link, P: OutputLine>(
        &mut self,
        initial: TallyState,
        link: &L,
        indicator: &mut IndicatorDriver<P>,
    ) -> Result<(), SessionError> {
        self.discard();

        loop {
            match self.establish(initial).await {
                Ok(session) => {
                    self.retry.succeeded();
                    self.session = Some(session);
                    info!(
                        "Session live on {}, announced {}",
                        self.config.status_topic, initial
                    );
                    return Ok(());
                }
                Err(e) if !link.is_connected() => {
                    warn!(
                        "Session setup failed with link {} down: {}",
                        link.describe(),
                        e
                    );
                    return Err(SessionError::LinkLost);
                }
                Err(e) => self.retry.pause(indicator, &e).await,
            }
        }
    }

    async fn establish(&mut self, initial: TallyState) -> Result<C::Session, SessionError> {
        let topic = self.config.status_topic.clone();
        let setup =
            SessionSetup::create(self.config.mqtt_options(), topic.clone()).register_will();

        let mut session = setup.open(&mut self.connector).await?;
        session.subscribe(&topic).await?;
        session.publish(&topic, initial.as_payload()).await?;
        Ok(session)
    }

    /// Processes one batch of inbound messages in receipt order.
    ///
    /// Real states go to the store and are rendered when they change. The
    /// liveness signal re-publishes the current state once. Unknown payloads
    /// are logged and dropped.
    pub async fn pump<P: OutputLine>(
        &mut self,
        store: &mut StateStore,
        indicator: &mut IndicatorDriver<P>,
    ) -> Result<PumpReport, SessionFault> {
        let topic = &self.config.status_topic;
        let session = self.session.as_mut().ok_or(SessionFault::Disconnected)?;
        let batch = session.next_batch().await?;

        let mut report = PumpReport::default();
        for message in batch {
            if message.topic != *topic {
                debug!("Ignoring message on foreign topic {}", message.topic);
                continue;
            }
            report.received += 1;

            match store.apply(&message.payload) {
                Ok(Applied::Changed(state)) => {
                    report.changed += 1;
                    indicator.render(state);
                }
                Ok(Applied::Unchanged(state)) => debug!("{} unchanged", state),
                Ok(Applied::LivenessObserved) => {
                    let current = store.current();
                    info!("Liveness signal on {}, re-asserting {}", topic, current);
                    session.publish(topic, current.as_payload()).await?;
                    report.republished += 1;
                }
                Err(e) => {
                    warn!("Dropping message {}: {}", message, e);
                    report.rejected += 1;
                }
            }
        }
        Ok(report)
    }
}
