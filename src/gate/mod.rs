//! Async mutual-exclusion gate.
//!
//! A [`MutexGate`] serializes multi-step async sequences that touch one
//! shared resource. Each caller asks for a [`Ticket`], locks it, performs its
//! steps (network calls, view updates) and unlocks it. Requests are granted
//! first-in, first-out; a request that waits longer than the gate's timeout
//! fails with [`GateError::Timeout`] and is dropped from the queue.
//!
//! The gate does not know about the resource it protects. Code that bypasses
//! the gate can still race with code that uses it.

mod error;
mod manager;
mod mutex_gate;
mod options;
mod state;
mod ticket;

pub use error::GateError;
pub use manager::{GateManager, InMemoryGateManager};
pub use mutex_gate::{GateStatus, MutexGate};
pub use options::{GateOptions, DEFAULT_TIMEOUT_MS};
pub use ticket::Ticket;
