//! Async mutual-exclusion gate for single-threaded cooperative schedulers.
//!
//! Several independent tasks (a periodic refresh, click handlers, a save
//! action) often update one shared view through multi-step async sequences.
//! Each step is atomic with respect to other tasks, but the sequence is not.
//! A [`MutexGate`] makes the whole sequence exclusive: acquire a ticket, lock
//! it, do the work, unlock it.
//!
//! The `awards` feature (on by default) adds the awards check-in board that
//! uses a gate to serialize its refreshes and user actions.

pub mod gate;

#[cfg(feature = "awards")]
pub mod awards;

pub use gate::{
    GateError, GateManager, GateOptions, GateStatus, InMemoryGateManager, MutexGate, Ticket,
};
