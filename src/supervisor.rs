//! Top-level control loop
//!
//! One control flow drives everything: bring the link up, make sure a session
//! exists, replay the canonical state onto the indicator after any recovery,
//! then pump one batch of messages. A session fault discards the session and
//! the next iteration rebuilds it from the store.
//!
//! ```text
//! ┌──► LinkManager::ensure_connected ──► SessionClient::ensure_session ──► render(current)
//! │                                               (only if no session)          │
//! └──────────── discard on SessionFault ◄──── SessionClient::pump ◄─────────────┘
//! ```

use crate::indicator::{IndicatorDriver, OutputLine};
use crate::link::{Link, LinkManager};
use crate::mqtt::session::PumpReport;
use crate::mqtt::{Connector, SessionClient};
use crate::state::{StateStore, TallyState};
use tracing::{info, warn};

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Running counters for the device, logged on every connection transition.
#[derive(Clone, Debug, Default)]
pub struct DeviceStatus {
    pub connection_state: ConnectionState,
    pub messages_received: usize,
    pub state_changes: usize,
    pub republished: usize,
    pub rejected: usize,
    pub sessions_opened: usize,
    pub session_rebuilds: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

impl DeviceStatus {
    fn record(&mut self, report: &PumpReport) {
        self.messages_received += report.received;
        self.state_changes += report.changed;
        self.republished += report.republished;
        self.rejected += report.rejected;
        if report.received > 0 {
            self.last_activity = Some(chrono::Local::now());
        }
    }
}

pub struct Supervisor<L: Link, C: Connector, P: OutputLine> {
    link: LinkManager<L>,
    session: SessionClient<C>,
    store: StateStore,
    indicator: IndicatorDriver<P>,
    status: DeviceStatus,
}

impl<L: Link, C: Connector, P: OutputLine> Supervisor<L, C, P> {
    pub fn new(
        link: LinkManager<L>,
        session: SessionClient<C>,
        indicator: IndicatorDriver<P>,
    ) -> Self {
        Self {
            link,
            session,
            store: StateStore::new(),
            indicator,
            status: DeviceStatus::default(),
        }
    }

    /// Runs for the lifetime of the process.
    pub async fn run(&mut self) {
        info!("Supervising tally on {}", self.session.status_topic());
        loop {
            self.step().await;
        }
    }

    /// One iteration of the control loop.
    pub async fn step(&mut self) {
        if !self.link.is_connected() {
            self.set_state(ConnectionState::Disconnected);
            self.link.ensure_connected(&mut self.indicator).await;

            // The link blink pattern overwrote the lines
            if self.session.has_session() {
                self.indicator.render(self.store.current());
                self.set_state(ConnectionState::Connected);
            }
        }

        if !self.session.has_session() {
            let next = if self.status.sessions_opened == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            };
            self.set_state(next);

            let initial = self.store.current();
            if let Err(e) = self
                .session
                .ensure_session(initial, self.link.link(), &mut self.indicator)
                .await
            {
                warn!("No session this cycle: {}", e);
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            self.status.sessions_opened += 1;
            self.indicator.render(self.store.current());
            self.set_state(ConnectionState::Connected);
        }

        match self.session.pump(&mut self.store, &mut self.indicator).await {
            Ok(report) => self.status.record(&report),
            Err(fault) => {
                warn!(
                    "Session fault on {}: {}, rebuilding with {}",
                    self.session.status_topic(),
                    fault,
                    self.store.current()
                );
                self.session.discard();
                self.status.session_rebuilds += 1;
                self.set_state(ConnectionState::Reconnecting);
            }
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.status.connection_state != next {
            info!(
                "Connection {:?} -> {:?} (received: {}, republished: {}, rebuilds: {})",
                self.status.connection_state,
                next,
                self.status.messages_received,
                self.status.republished,
                self.status.session_rebuilds
            );
            self.status.connection_state = next;
        }
    }

    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    pub fn current_state(&self) -> TallyState {
        self.store.current()
    }
}
