//! Test doubles for the output lines, the link and the broker

use crate::error::{SessionError, SessionFault, TransportError};
use crate::indicator::{IndicatorDriver, OutputLine};
use crate::link::Link;
use crate::mqtt::config::SessionConfig;
use crate::mqtt::message_manager::InboundMessage;
use crate::mqtt::{Connector, PubSub};
use rumqttc::MqttOptions;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Output line that remembers every level written to it.
#[derive(Clone, Default)]
pub struct RecordingLine(Rc<RefCell<Vec<bool>>>);

impl RecordingLine {
    pub fn level(&self) -> bool {
        self.0.borrow().last().copied().unwrap_or(false)
    }

    pub fn history(&self) -> Vec<bool> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl OutputLine for RecordingLine {
    fn set_level(&mut self, high: bool) {
        self.0.borrow_mut().push(high);
    }
}

pub fn recording_driver() -> (IndicatorDriver<RecordingLine>, RecordingLine, RecordingLine) {
    let on_air = RecordingLine::default();
    let on_camera = RecordingLine::default();
    let driver = IndicatorDriver::new(
        on_air.clone(),
        on_camera.clone(),
        Duration::from_millis(500),
    );
    (driver, on_air, on_camera)
}

pub fn session_config(topic: &str) -> SessionConfig {
    SessionConfig {
        client_id: "tally-test".to_string(),
        host: "broker.test".to_string(),
        port: 1883,
        username: None,
        password: None,
        keep_alive: Duration::from_secs(5),
        status_topic: topic.to_string(),
        retry_cadence: Duration::from_secs(1),
    }
}

#[derive(Default)]
struct LinkScript {
    up: bool,
    failures_left: u32,
    attempts: u32,
}

/// Link that fails a scripted number of connects before coming up.
#[derive(Clone, Default)]
pub struct ScriptedLink(Rc<RefCell<LinkScript>>);

impl ScriptedLink {
    pub fn up() -> Self {
        let link = Self::default();
        link.0.borrow_mut().up = true;
        link
    }

    pub fn failing_times(failures: u32) -> Self {
        let link = Self::default();
        link.0.borrow_mut().failures_left = failures;
        link
    }

    pub fn drop_link(&self) {
        self.0.borrow_mut().up = false;
    }

    pub fn fail_next(&self, failures: u32) {
        self.0.borrow_mut().failures_left = failures;
    }

    pub fn connect_attempts(&self) -> u32 {
        self.0.borrow().attempts
    }
}

impl Link for ScriptedLink {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut script = self.0.borrow_mut();
        script.attempts += 1;
        if script.failures_left > 0 {
            script.failures_left -= 1;
            return Err(TransportError::InterfaceDown {
                interface: "wlan0".to_string(),
                state: "down".to_string(),
            });
        }
        script.up = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().up
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

#[derive(Default)]
struct BrokerState {
    opened: Vec<MqttOptions>,
    calls: Vec<String>,
    publishes: Vec<(String, String)>,
    open_failures: u32,
    drop_on_failure: Option<ScriptedLink>,
    batches: VecDeque<Result<Vec<InboundMessage>, SessionFault>>,
}

/// In-memory broker acting as connector; sessions share its log and script.
#[derive(Clone, Default)]
pub struct ScriptedBroker(Rc<RefCell<BrokerState>>);

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_opens(&self, failures: u32) {
        self.0.borrow_mut().open_failures = failures;
    }

    pub fn drop_link_on_failure(&self, link: ScriptedLink) {
        self.0.borrow_mut().drop_on_failure = Some(link);
    }

    pub fn deliver(&self, topic: &str, payloads: &[&str]) {
        let batch = payloads
            .iter()
            .map(|payload| InboundMessage::from_topic(topic, *payload))
            .collect();
        self.0.borrow_mut().batches.push_back(Ok(batch));
    }

    pub fn fault(&self) {
        self.0
            .borrow_mut()
            .batches
            .push_back(Err(SessionFault::Connection("broken pipe".to_string())));
    }

    pub fn opened(&self) -> usize {
        self.0.borrow().opened.len()
    }

    pub fn last_options(&self) -> Option<MqttOptions> {
        self.0.borrow().opened.last().cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.borrow().calls.clone()
    }

    pub fn publishes(&self) -> Vec<(String, String)> {
        self.0.borrow().publishes.clone()
    }
}

impl Connector for ScriptedBroker {
    type Session = ScriptedSession;

    async fn open(&mut self, options: MqttOptions) -> Result<ScriptedSession, SessionError> {
        let mut state = self.0.borrow_mut();
        state.calls.push("open".to_string());
        state.opened.push(options);

        if state.open_failures > 0 {
            state.open_failures -= 1;
            if let Some(link) = &state.drop_on_failure {
                link.drop_link();
            }
            return Err(SessionError::Refused("NotAuthorized".to_string()));
        }

        Ok(ScriptedSession {
            broker: self.clone(),
        })
    }
}

pub struct ScriptedSession {
    broker: ScriptedBroker,
}

impl PubSub for ScriptedSession {
    async fn subscribe(&mut self, topic: &str) -> Result<(), SessionFault> {
        self.broker
            .0
            .borrow_mut()
            .calls
            .push(format!("subscribe {}", topic));
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), SessionFault> {
        let mut state = self.broker.0.borrow_mut();
        state.calls.push(format!("publish {} {}", topic, payload));
        state
            .publishes
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    async fn next_batch(&mut self) -> Result<Vec<InboundMessage>, SessionFault> {
        self.broker
            .0
            .borrow_mut()
            .batches
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
