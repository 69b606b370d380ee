// src/health/state.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Health rank of a resource, ordered worst to best.
///
/// Any state added later must keep the ordering: a degraded state ranks
/// strictly between `Down` and `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum State {
    Down = 0,
    Warn = 1,
    Up = 2,
}

impl State {
    /// Returns the more degraded of the two states.
    pub fn worse(a: State, b: State) -> State {
        if a == State::Down || b == State::Down {
            State::Down
        } else if a == State::Warn || b == State::Warn {
            State::Warn
        } else {
            State::Up
        }
    }

    /// Folds many states into one. An empty input is `Up`.
    pub fn worst<I>(states: I) -> State
    where
        I: IntoIterator<Item = State>,
    {
        states.into_iter().fold(State::Up, State::worse)
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Down => "down",
            State::Warn => "warn",
            State::Up => "up",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single probe: a state plus caller-defined details.
///
/// The monitor stores `details` as-is and never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub state: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Status {
    pub fn new(state: State) -> Self {
        Self {
            state,
            details: None,
        }
    }

    pub fn up() -> Self {
        Self::new(State::Up)
    }

    pub fn warn() -> Self {
        Self::new(State::Warn)
    }

    pub fn down() -> Self {
        Self::new(State::Down)
    }

    pub fn with_details(mut self, details: impl Into<Value>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::down()
    }
}

/// Cached status of one check and when it was produced.
///
/// The default value is the "not yet observed" placeholder: `Down` with no
/// timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckStatus {
    pub status: Status,
    pub timestamp: Option<DateTime<Utc>>,
}

impl CheckStatus {
    pub fn observed(status: Status, timestamp: DateTime<Utc>) -> Self {
        Self {
            status,
            timestamp: Some(timestamp),
        }
    }

    pub fn state(&self) -> State {
        self.status.state
    }

    pub fn is_observed(&self) -> bool {
        self.timestamp.is_some()
    }
}
