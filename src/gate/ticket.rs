use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::state::Shared;
use super::GateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Granted,
    Locked,
    Released,
}

/// The token handed out by [`MutexGate::acquire`](super::MutexGate::acquire).
///
/// A ticket owns the gate's slot from the moment it is granted. A ticket
/// granted on a free gate leaves it free until [`lock`](Ticket::lock) is
/// called; a ticket handed over from the queue finds the gate still held. In
/// both cases the caller calls `lock` before its work and
/// [`unlock`](Ticket::unlock) after it. Dropping the ticket releases it as
/// well.
pub struct Ticket {
    shared: Arc<Shared>,
    id: u64,
    phase: Phase,
}

impl Ticket {
    pub(crate) fn new(shared: Arc<Shared>, id: u64) -> Self {
        Ticket {
            shared,
            id,
            phase: Phase::Granted,
        }
    }

    /// Name of the gate this ticket was issued by.
    pub fn gate_name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_locked(&self) -> bool {
        self.phase == Phase::Locked
    }

    /// Mark the gate held by this ticket.
    pub fn lock(&mut self) -> Result<(), GateError> {
        match self.phase {
            Phase::Granted => {}
            Phase::Locked => return Err(self.invalid("already locked")),
            Phase::Released => return Err(self.invalid("ticket already released")),
        }

        let mut state = self.shared.state()?;
        if state.grant != Some(self.id) {
            return Err(self.invalid("ticket is not the current grant"));
        }
        state.locked = true;
        self.phase = Phase::Locked;
        debug!(gate = %self.shared.name, ticket = self.id, "locked");
        Ok(())
    }

    /// Mark the gate free and grant the next queued request, if any.
    pub fn unlock(&mut self) -> Result<(), GateError> {
        match self.phase {
            Phase::Locked => {}
            Phase::Granted => return Err(self.invalid("unlock without lock")),
            Phase::Released => return Err(self.invalid("ticket already released")),
        }

        self.shared.state()?.release(&self.shared.name, self.id);
        self.phase = Phase::Released;
        debug!(gate = %self.shared.name, ticket = self.id, "unlocked");
        Ok(())
    }

    /// Give back whatever this ticket holds, locked or not.
    ///
    /// Unlike `unlock`, this never fails on ticket phase, so it is the call to
    /// make from cleanup paths that may run before `lock` was reached.
    pub fn release(mut self) -> Result<(), GateError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), GateError> {
        if self.phase == Phase::Released {
            return Ok(());
        }
        self.shared.state()?.release(&self.shared.name, self.id);
        self.phase = Phase::Released;
        Ok(())
    }

    fn invalid(&self, reason: &'static str) -> GateError {
        GateError::InvalidTicket {
            name: self.shared.name.clone(),
            reason,
        }
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("gate", &self.shared.name)
            .field("id", &self.id)
            .field("phase", &self.phase)
            .finish()
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.phase == Phase::Locked {
            warn!(
                gate = %self.shared.name,
                ticket = self.id,
                "ticket dropped while locked; releasing gate"
            );
        }
        if let Err(err) = self.release_inner() {
            warn!(gate = %self.shared.name, error = %err, "failed to release dropped ticket");
        }
    }
}
