use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::GateError;

/// Acquisition timeout used when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Options for a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateOptions {
    /// Maximum time a request may wait in the queue before it fails with
    /// `GateError::Timeout`. Does not bound how long a holder keeps the lock.
    pub timeout_ms: u64,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl GateOptions {
    /// Create options with the given acquisition timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    /// Create options with the given acquisition timeout in milliseconds.
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), GateError> {
        if self.timeout_ms == 0 {
            return Err(GateError::InvalidOptions(
                "timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
