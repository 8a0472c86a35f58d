use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::BoardError;
use crate::gate::GateOptions;

/// Name of the gate guarding the awards view.
pub const DEFAULT_GATE_NAME: &str = "awards-table-update";

/// Seconds between periodic refreshes.
pub const DEFAULT_POLL_PERIOD_SECS: u64 = 5;

/// Configuration for an [`AwardsBoard`](super::AwardsBoard) and its poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Event shown when the board starts.
    pub event_id: Option<u64>,
    pub poll_period_secs: u64,
    pub gate_name: String,
    pub gate: GateOptions,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            event_id: None,
            poll_period_secs: DEFAULT_POLL_PERIOD_SECS,
            gate_name: DEFAULT_GATE_NAME.to_string(),
            gate: GateOptions::default(),
        }
    }
}

impl BoardConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, BoardError> {
        let config: BoardConfig =
            serde_json::from_str(json).map_err(|e| BoardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        if self.poll_period_secs == 0 {
            return Err(BoardError::Config(
                "poll_period_secs must be greater than zero".into(),
            ));
        }
        if self.gate_name.is_empty() {
            return Err(BoardError::Config("gate_name must not be empty".into()));
        }
        self.gate
            .validate()
            .map_err(|e| BoardError::Config(e.to_string()))
    }
}
