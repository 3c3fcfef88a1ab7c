//! # MQTT session layer
//!
//! Owns the pub/sub side of the device: one disposable session at a time on
//! top of an already established link.
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker settings resolved into rumqttc options
//! ├── message_manager.rs  - Inbound message representation
//! ├── mqtt_handler.rs     - rumqttc backed connector and session
//! └── session.rs          - Setup state machine and the session client
//! ```
//!
//! ## Session lifecycle
//!
//! ```text
//! Unregistered ──register_will──► WillRegistered ──open──► subscribe ──► publish state ──► pump
//!                                                                                            │
//!                                     discard on SessionFault, rebuild from StateStore ◄─────┘
//! ```
//!
//! The last will (`offline`, retained, QoS 1) is set on the options before the
//! session opens, so the broker always has it for the session's whole lifetime.

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;
pub mod session;

use crate::error::{SessionError, SessionFault};
use message_manager::InboundMessage;
use rumqttc::MqttOptions;

pub use mqtt_handler::MqttConnector;
pub use session::SessionClient;

/// An opened pub/sub session. Every publish is retained with QoS 1.
#[allow(async_fn_in_trait)]
pub trait PubSub {
    async fn subscribe(&mut self, topic: &str) -> Result<(), SessionFault>;

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), SessionFault>;

    /// Waits for the next batch of inbound publishes. An empty batch is fine.
    async fn next_batch(&mut self) -> Result<Vec<InboundMessage>, SessionFault>;
}

/// Opens brand-new sessions. A session is never reused after it is dropped.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: PubSub;

    /// Opens a session from fully prepared options, last will included.
    async fn open(&mut self, options: MqttOptions) -> Result<Self::Session, SessionError>;
}
