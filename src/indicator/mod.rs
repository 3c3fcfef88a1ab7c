//! Indicator driver for the two tally output lines
//!
//! Maps the canonical state onto two boolean outputs and drives the blink
//! patterns shown while the link or the session is being recovered.
//!
//! ```text
//! state      on-air  on-camera
//! Off        low     low
//! OnAir      high    low
//! OnCamera   low     high
//! ```
//!
//! A fault pattern never touches the canonical state. The supervisor renders
//! the current state again as soon as recovery completes.

pub mod gpio;

use crate::state::TallyState;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// One boolean output line.
pub trait OutputLine {
    fn set_level(&mut self, high: bool);
}

/// Which layer is being recovered. Each kind blinks a different line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Transport link is down, blinks the on-air line
    LinkDown,
    /// Session cannot be opened, blinks the on-camera line
    SessionDown,
}

/// Output levels `(on_air, on_camera)` for a canonical state.
pub fn levels(state: TallyState) -> (bool, bool) {
    match state {
        TallyState::Off => (false, false),
        TallyState::OnAir => (true, false),
        TallyState::OnCamera => (false, true),
    }
}

pub struct IndicatorDriver<P: OutputLine> {
    on_air: P,
    on_camera: P,
    blink_period: Duration,
    rendered: Option<TallyState>,
}

impl<P: OutputLine> IndicatorDriver<P> {
    pub fn new(on_air: P, on_camera: P, blink_period: Duration) -> Self {
        Self {
            on_air,
            on_camera,
            blink_period,
            rendered: None,
        }
    }

    /// Drives both lines to the truth-table row of `state`.
    ///
    /// Idempotent: rendering the same state twice writes the same levels.
    pub fn render(&mut self, state: TallyState) {
        let (on_air, on_camera) = levels(state);
        self.on_air.set_level(on_air);
        self.on_camera.set_level(on_camera);

        if self.rendered != Some(state) {
            info!("Indicator showing {}", state);
            self.rendered = Some(state);
        }
    }

    /// Blinks the line belonging to `fault` for `wait`, holding the other one low.
    ///
    /// Returns after the full wait so the caller can use it as its retry pause.
    pub async fn signal_fault(&mut self, fault: Fault, wait: Duration) {
        debug!("Signaling {:?} for {:?}", fault, wait);
        self.rendered = None;

        let (blinking, steady) = match fault {
            Fault::LinkDown => (&mut self.on_air, &mut self.on_camera),
            Fault::SessionDown => (&mut self.on_camera, &mut self.on_air),
        };
        steady.set_level(false);

        let deadline = Instant::now() + wait;
        let mut level = true;
        while Instant::now() < deadline {
            blinking.set_level(level);
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.blink_period.min(remaining)).await;
            level = !level;
        }
        blinking.set_level(false);
    }

    pub fn rendered(&self) -> Option<TallyState> {
        self.rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::recording_driver as driver;

    #[test]
    fn test_truth_table() {
        let (mut driver, on_air, on_camera) = driver();

        driver.render(TallyState::Off);
        assert_eq!((on_air.level(), on_camera.level()), (false, false));

        driver.render(TallyState::OnAir);
        assert_eq!((on_air.level(), on_camera.level()), (true, false));

        driver.render(TallyState::OnCamera);
        assert_eq!((on_air.level(), on_camera.level()), (false, true));
    }

    #[test]
    fn test_never_both_high() {
        let (mut driver, on_air, on_camera) = driver();
        for state in TallyState::ALL {
            driver.render(state);
            driver.render(state);
            assert_eq!((on_air.level(), on_camera.level()), levels(state));
        }
        for state in TallyState::ALL {
            assert_ne!(levels(state), (true, true));
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let (mut driver, on_air, on_camera) = driver();
        driver.render(TallyState::OnCamera);
        driver.render(TallyState::OnCamera);
        assert!(on_air.history().iter().all(|level| !level));
        assert!(on_camera.history().iter().all(|level| *level));
        assert_eq!(driver.rendered(), Some(TallyState::OnCamera));
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_fault_blinks_on_air_only() {
        let (mut driver, on_air, on_camera) = driver();
        driver.render(TallyState::OnCamera);

        driver
            .signal_fault(Fault::LinkDown, Duration::from_secs(2))
            .await;

        let blinks = on_air.history();
        assert!(blinks.iter().filter(|level| **level).count() >= 2);
        assert!(!on_air.level());
        assert!(on_camera.history().ends_with(&[false]));
        assert!(!on_camera.level());
        assert_eq!(driver.rendered(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_fault_blinks_on_camera_only() {
        let (mut driver, on_air, on_camera) = driver();

        let started = Instant::now();
        driver
            .signal_fault(Fault::SessionDown, Duration::from_secs(1))
            .await;

        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(on_camera.history(), vec![true, false, false]);
        assert_eq!(on_air.history(), vec![false]);
    }
}
