//! Fixed-cadence retry pause shared by the link manager and the session client.
//! No backoff: the blink rhythm stays constant while a fault lasts.

use crate::indicator::{Fault, IndicatorDriver, OutputLine};
use std::fmt::Display;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct FaultRetry {
    fault: Fault,
    cadence: Duration,
    attempts: u32,
}

impl FaultRetry {
    pub fn new(fault: Fault, cadence: Duration) -> Self {
        Self {
            fault,
            cadence,
            attempts: 0,
        }
    }

    /// Records a failed attempt and blinks the fault pattern for one cadence.
    pub async fn pause<P: OutputLine>(
        &mut self,
        indicator: &mut IndicatorDriver<P>,
        error: &dyn Display,
    ) {
        self.attempts += 1;
        warn!(
            "{:?}: attempt {} failed ({}), retrying in {:?}",
            self.fault, self.attempts, error, self.cadence
        );
        indicator.signal_fault(self.fault, self.cadence).await;
    }

    /// Clears the attempt counter after a success, returning how many failures preceded it.
    pub fn succeeded(&mut self) -> u32 {
        let failures = std::mem::take(&mut self.attempts);
        if failures > 0 {
            info!("{:?} recovered after {} failed attempts", self.fault, failures);
        }
        failures
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
