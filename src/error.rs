//! Error types for the tally light core
//!
//! Every class here has a local recovery path; none of them ends the process
//! once the supervisor is running. Only [`ConfigError`] and [`IndicatorError`]
//! can abort startup.

use thiserror::Error;

/// Link-level failure, retried by the link manager at a fixed cadence.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Interface {interface} is not up (state: {state})")]
    InterfaceDown { interface: String, state: String },

    #[error("Failed to read state of interface {interface}: {source}")]
    Unreadable {
        interface: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to establish a session on a healthy link.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The broker answered the connect with a refusal (bad credentials etc.)
    #[error("Broker refused the session: {0}")]
    Refused(String),

    #[error("No CONNACK within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Connection error while opening session: {0}")]
    Connection(String),

    /// Subscribe or initial publish failed right after the session opened.
    #[error("Session setup failed: {0}")]
    Setup(#[from] SessionFault),

    /// The link dropped while retrying; the supervisor has to bring it back first.
    #[error("Link lost while establishing the session")]
    LinkLost,
}

/// Failure on an established session. The session is discarded and rebuilt.
#[derive(Debug, Error)]
pub enum SessionFault {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Client request failed: {0}")]
    Client(String),

    #[error("Broker closed the session")]
    Disconnected,
}

/// A payload outside the tally vocabulary. Logged and dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unrecognized tally state: {0:?}")]
pub struct UnrecognizedState(pub String);

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// GPIO setup errors for the two indicator lines.
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("GPIO error on pin {pin}: {source}")]
    Gpio {
        pin: u8,
        #[source]
        source: rppal::gpio::Error,
    },
}
