//! Network interface link backed by the Linux sysfs operational state
//!
//! Association and credentials are handled by the OS network stack; this
//! link only observes whether the configured interface reports `up`.

use super::Link;
use crate::error::TransportError;
use std::path::PathBuf;

const SYSFS_NET: &str = "/sys/class/net";

#[derive(Debug, Clone)]
pub struct InterfaceLink {
    interface: String,
    sysfs_root: PathBuf,
}

impl InterfaceLink {
    pub fn new(interface: impl Into<String>) -> Self {
        Self::with_root(interface, SYSFS_NET)
    }

    pub fn with_root(interface: impl Into<String>, sysfs_root: impl Into<PathBuf>) -> Self {
        Self {
            interface: interface.into(),
            sysfs_root: sysfs_root.into(),
        }
    }

    fn operstate_path(&self) -> PathBuf {
        self.sysfs_root.join(&self.interface).join("operstate")
    }

    fn check(&self, state: &str) -> Result<(), TransportError> {
        match state.trim() {
            "up" => Ok(()),
            other => Err(TransportError::InterfaceDown {
                interface: self.interface.clone(),
                state: other.to_string(),
            }),
        }
    }
}

impl Link for InterfaceLink {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let state = tokio::fs::read_to_string(self.operstate_path())
            .await
            .map_err(|source| TransportError::Unreadable {
                interface: self.interface.clone(),
                source,
            })?;
        self.check(&state)
    }

    /// `Link::is_connected` is sync, so this is a plain read. sysfs attributes
    /// are served from kernel memory and never block on a device.
    fn is_connected(&self) -> bool {
        std::fs::read_to_string(self.operstate_path())
            .map(|state| self.check(&state).is_ok())
            .unwrap_or(false)
    }

    fn describe(&self) -> String {
        self.interface.clone()
    }
}
