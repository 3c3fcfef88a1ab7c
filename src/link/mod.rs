//! Transport link lifecycle
//!
//! The link manager blocks until the network link is up, blinking the
//! `LinkDown` pattern between attempts. There is no upper retry bound.

pub mod interface;

use crate::error::TransportError;
use crate::indicator::{Fault, IndicatorDriver, OutputLine};
use crate::retry::FaultRetry;
use std::time::Duration;
use tracing::{debug, info};

pub use interface::InterfaceLink;

/// A network link the device depends on.
#[allow(async_fn_in_trait)]
pub trait Link {
    /// One connection attempt.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Cheap, non-blocking liveness check.
    fn is_connected(&self) -> bool;

    fn describe(&self) -> String;
}

pub struct LinkManager<L: Link> {
    link: L,
    retry: FaultRetry,
}

impl<L: Link> LinkManager<L> {
    pub fn new(link: L, retry_cadence: Duration) -> Self {
        Self {
            link,
            retry: FaultRetry::new(Fault::LinkDown, retry_cadence),
        }
    }

    /// Returns once the link is up.
    pub async fn ensure_connected<P: OutputLine>(&mut self, indicator: &mut IndicatorDriver<P>) {
        if self.link.is_connected() {
            debug!("Link {} already up", self.link.describe());
            return;
        }

        info!("Bringing up link {}", self.link.describe());
        loop {
            match self.link.connect().await {
                Ok(()) => {
                    self.retry.succeeded();
                    info!("Link {} is up", self.link.describe());
                    return;
                }
                Err(e) => self.retry.pause(indicator, &e).await,
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{recording_driver, ScriptedLink};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_retries_at_fixed_cadence_until_up() {
        let link = ScriptedLink::failing_times(3);
        let mut manager = LinkManager::new(link.clone(), Duration::from_secs(1));
        let (mut indicator, on_air, on_camera) = recording_driver();

        let started = Instant::now();
        manager.ensure_connected(&mut indicator).await;

        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(link.connect_attempts(), 4);
        assert!(manager.is_connected());
        assert!(on_air.history().contains(&true));
        assert!(!on_camera.history().contains(&true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_link_is_not_touched() {
        let link = ScriptedLink::up();
        let mut manager = LinkManager::new(link.clone(), Duration::from_secs(1));
        let (mut indicator, on_air, _) = recording_driver();

        manager.ensure_connected(&mut indicator).await;

        assert_eq!(link.connect_attempts(), 0);
        assert!(on_air.history().is_empty());
    }
}
