//! Canonical tally state and the store that owns it
//!
//! The store is the only piece of state that survives a session rebuild. It
//! lives in memory for the lifetime of the process and is never persisted.

use crate::error::UnrecognizedState;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Payload published by the broker on our behalf when the session dies uncleanly.
pub const OFFLINE_PAYLOAD: &str = "offline";

/// The three values the device can display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TallyState {
    #[default]
    Off,
    OnAir,
    OnCamera,
}

impl TallyState {
    pub const ALL: [TallyState; 3] = [TallyState::Off, TallyState::OnAir, TallyState::OnCamera];

    /// Wire representation on the status topic
    pub fn as_payload(&self) -> &'static str {
        match self {
            TallyState::Off => "off",
            TallyState::OnAir => "on-air",
            TallyState::OnCamera => "on-camera",
        }
    }
}

impl fmt::Display for TallyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_payload())
    }
}

impl FromStr for TallyState {
    type Err = UnrecognizedState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(TallyState::Off),
            "on-air" => Ok(TallyState::OnAir),
            "on-camera" => Ok(TallyState::OnCamera),
            other => Err(UnrecognizedState(other.to_string())),
        }
    }
}

/// Outcome of applying one inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The canonical state was replaced by a different value.
    Changed(TallyState),
    /// A real state that equals the current one.
    Unchanged(TallyState),
    /// Our own last will (or someone else's view of it). State is untouched,
    /// the caller re-asserts the current state on the broker.
    LivenessObserved,
}

#[derive(Debug, Default)]
pub struct StateStore {
    current: TallyState,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> TallyState {
        self.current
    }

    /// Applies a raw payload from the status topic.
    ///
    /// `"offline"` never overwrites the canonical state, and anything outside the
    /// vocabulary leaves it untouched as well.
    pub fn apply(&mut self, payload: &str) -> Result<Applied, UnrecognizedState> {
        if payload == OFFLINE_PAYLOAD {
            debug!("Liveness signal observed, keeping {}", self.current);
            return Ok(Applied::LivenessObserved);
        }

        let next: TallyState = payload.parse()?;
        if next == self.current {
            return Ok(Applied::Unchanged(next));
        }

        debug!("Tally state {} -> {}", self.current, next);
        self.current = next;
        Ok(Applied::Changed(next))
    }
}
