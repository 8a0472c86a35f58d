use std::fmt;
use std::time::Duration;

/// Error type for gate operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The request was still queued when the gate's timeout elapsed.
    Timeout { name: String, waited: Duration },
    /// A ticket was used out of order (locked twice, unlocked without a lock,
    /// or used after it was released).
    InvalidTicket { name: String, reason: &'static str },
    /// The gate was configured with unusable options.
    InvalidOptions(String),
    /// The internal state mutex was poisoned (a thread panicked while holding it).
    Poisoned(String),
}

impl GateError {
    /// Whether this is an acquisition timeout, the one recoverable failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GateError::Timeout { .. })
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::Timeout { name, waited } => write!(
                f,
                "gate '{}' not acquired within {} ms",
                name,
                waited.as_millis()
            ),
            GateError::InvalidTicket { name, reason } => {
                write!(f, "invalid ticket for gate '{}': {}", name, reason)
            }
            GateError::InvalidOptions(msg) => write!(f, "invalid gate options: {}", msg),
            GateError::Poisoned(msg) => write!(f, "gate state poisoned: {}", msg),
        }
    }
}

impl std::error::Error for GateError {}
