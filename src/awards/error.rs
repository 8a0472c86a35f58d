//! Error types for the awards board.

use std::error::Error;
use std::fmt;

use crate::gate::GateError;

/// Error type for awards board operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The board's gate refused or timed out.
    Gate(GateError),
    /// The backend reported an error (the `error` member of a response).
    Backend(String),
    /// A response body could not be decoded.
    Decode(String),
    /// Configuration was invalid.
    Config(String),
    /// `save_note` was called with no note open.
    NoNoteOpen,
    /// No event has been selected yet.
    NoEvent,
}

impl BoardError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BoardError::Gate(e) if e.is_timeout())
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::Gate(e) => write!(f, "gate error: {}", e),
            BoardError::Backend(msg) => write!(f, "backend error: {}", msg),
            BoardError::Decode(msg) => write!(f, "decode failed: {}", msg),
            BoardError::Config(msg) => write!(f, "invalid config: {}", msg),
            BoardError::NoNoteOpen => write!(f, "no note open"),
            BoardError::NoEvent => write!(f, "no event selected"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BoardError::Gate(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GateError> for BoardError {
    fn from(err: GateError) -> Self {
        BoardError::Gate(err)
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(err: serde_json::Error) -> Self {
        BoardError::Decode(err.to_string())
    }
}
