use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::state::Shared;
use super::{GateError, GateOptions, Ticket};

/// Observable state of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Free,
    Held,
}

/// A named, FIFO, timeout-bounded async mutual-exclusion gate.
///
/// Callers serialize a multi-step async sequence by acquiring a [`Ticket`],
/// locking it, doing their work, and unlocking it:
///
/// ```
/// # async fn demo() -> Result<(), mutex_gate::GateError> {
/// use mutex_gate::{GateOptions, MutexGate};
///
/// let gate = MutexGate::new("awards-table-update", GateOptions::default())?;
/// let mut ticket = gate.acquire().await?;
/// ticket.lock()?;
/// // ... network round-trips and view updates ...
/// ticket.unlock()?;
/// # Ok(())
/// # }
/// ```
///
/// Only the wait in the queue is bounded by the timeout. A holder keeps the
/// gate until it unlocks or drops its ticket.
///
/// Handles are cheap to clone; every clone refers to the same gate.
#[derive(Clone)]
pub struct MutexGate {
    shared: Arc<Shared>,
}

impl MutexGate {
    pub fn new(name: impl Into<String>, options: GateOptions) -> Result<Self, GateError> {
        options.validate()?;
        Ok(MutexGate {
            shared: Arc::new(Shared::new(name.into(), options)),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn timeout(&self) -> Duration {
        self.shared.options.timeout()
    }

    pub fn status(&self) -> Result<GateStatus, GateError> {
        let state = self.shared.state()?;
        Ok(if state.locked {
            GateStatus::Held
        } else {
            GateStatus::Free
        })
    }

    pub fn is_locked(&self) -> Result<bool, GateError> {
        Ok(self.status()? == GateStatus::Held)
    }

    /// Number of requests waiting in the queue.
    pub fn queued(&self) -> Result<usize, GateError> {
        Ok(self.shared.state()?.waiters.len())
    }

    /// Whether two handles refer to the same gate.
    pub fn same_gate(&self, other: &MutexGate) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Request the gate.
    ///
    /// Resolves immediately when no other ticket owns the slot and nobody is
    /// queued; otherwise waits its turn behind earlier requests. Fails with
    /// `GateError::Timeout` if the turn does not come within the configured
    /// timeout, in which case the request is removed from the queue and can
    /// never be granted later.
    pub async fn acquire(&self) -> Result<Ticket, GateError> {
        let name = &self.shared.name;
        let (id, mut rx) = {
            let mut state = self.shared.state()?;
            let id = state.next_ticket_id();
            if state.is_free() {
                state.grant = Some(id);
                debug!(gate = %name, ticket = id, "granted immediately");
                return Ok(Ticket::new(Arc::clone(&self.shared), id));
            }
            let rx = state.enqueue(id);
            trace!(gate = %name, ticket = id, queued = state.waiters.len(), "queued");
            (id, rx)
        };

        let mut pending = PendingRequest {
            shared: &self.shared,
            id,
            settled: false,
        };

        // `rx` stays alive until the outcome is settled, so a grant sent after
        // the timer fired is never skipped as cancelled.
        let _ = tokio::time::timeout(self.timeout(), &mut rx).await;

        let mut state = self.shared.state()?;
        pending.settled = true;
        if state.grant == Some(id) {
            return Ok(Ticket::new(Arc::clone(&self.shared), id));
        }
        state.dequeue(id);
        warn!(
            gate = %name,
            ticket = id,
            timeout_ms = self.shared.options.timeout_ms,
            "acquire timed out"
        );
        Err(GateError::Timeout {
            name: name.clone(),
            waited: self.timeout(),
        })
    }

    /// Run `body` while holding the gate.
    ///
    /// The gate is unlocked whether `body` succeeds or fails, and `body`'s
    /// error is returned after the next queued request has been granted.
    pub async fn with_lock<F, Fut, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<GateError>,
    {
        let mut ticket = self.acquire().await?;
        ticket.lock()?;
        let result = body().await;
        ticket.unlock()?;
        result
    }
}

impl fmt::Debug for MutexGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexGate")
            .field("name", &self.shared.name)
            .field("timeout_ms", &self.shared.options.timeout_ms)
            .finish()
    }
}

/// Cleans up a queued request whose `acquire` future is dropped mid-wait.
struct PendingRequest<'a> {
    shared: &'a Shared,
    id: u64,
    settled: bool,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Ok(mut state) = self.shared.state() else {
            return;
        };
        if !state.dequeue(self.id) {
            // Already granted but nobody will ever see the ticket.
            state.release(&self.shared.name, self.id);
        }
        trace!(gate = %self.shared.name, ticket = self.id, "cancelled request");
    }
}
