//! MutexGate integration tests.
//!
//! All async tests run on the current-thread runtime with the clock paused,
//! which is the single-threaded cooperative setting the gate is built for.


mod exclusion;
mod scenarios;
