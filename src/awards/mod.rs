//! Awards check-in board.
//!
//! The board shows one cell per award place, grouped by division. A poller
//! refreshes it every few seconds while staff toggle picked-up flags and edit
//! notes. Every backend round-trip plus view update runs under one
//! [`MutexGate`](crate::MutexGate), so refreshes and user actions never
//! interleave on the view.

mod backend;
mod board;
mod config;
mod error;
mod in_memory;
mod model;
mod poller;

pub use backend::AwardsBackend;
pub use board::{ordinal_suffix, AwardCell, AwardsBoard, AwardsView, CellKey, NoteEditor};
pub use config::{BoardConfig, DEFAULT_GATE_NAME, DEFAULT_POLL_PERIOD_SECS};
pub use error::BoardError;
pub use in_memory::{Awardee, InMemoryAwardsBackend};
pub use model::{decode_awards, decode_notes, decode_pickup, Award, AwardsData, Division, PickupStatus};
pub use poller::{AwardsPoller, PollStats};
