use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::{GateError, GateOptions};

/// A queued acquisition request.
pub(crate) struct Waiter {
    pub(crate) id: u64,
    grant: oneshot::Sender<()>,
}

/// Mutable state of one gate.
///
/// `grant` is the ticket that currently owns the slot, whether or not it has
/// been locked yet. `locked` implies `grant.is_some()`. A slot handed over
/// from the queue on release stays locked through the handover.
#[derive(Default)]
pub(crate) struct GateState {
    pub(crate) locked: bool,
    pub(crate) grant: Option<u64>,
    pub(crate) waiters: VecDeque<Waiter>,
    next_id: u64,
}

impl GateState {
    pub(crate) fn next_ticket_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Whether a new request can be granted without queueing.
    pub(crate) fn is_free(&self) -> bool {
        self.grant.is_none() && self.waiters.is_empty()
    }

    pub(crate) fn enqueue(&mut self, id: u64) -> oneshot::Receiver<()> {
        let (grant, rx) = oneshot::channel();
        self.waiters.push_back(Waiter { id, grant });
        rx
    }

    /// Remove a still-queued request. Returns false if it is no longer queued.
    pub(crate) fn dequeue(&mut self, id: u64) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(pos) => {
                self.waiters.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Give up the slot held by `id` and hand it to the next live waiter.
    pub(crate) fn release(&mut self, name: &str, id: u64) {
        if self.grant != Some(id) {
            return;
        }
        self.locked = false;
        self.grant = None;
        self.grant_next(name);
    }

    fn grant_next(&mut self, name: &str) {
        while let Some(waiter) = self.waiters.pop_front() {
            // A closed receiver means the waiter's future was dropped.
            if waiter.grant.send(()).is_ok() {
                debug!(gate = name, ticket = waiter.id, "granted queued request");
                self.grant = Some(waiter.id);
                self.locked = true;
                return;
            }
            trace!(gate = name, ticket = waiter.id, "skipped cancelled request");
        }
    }
}

/// State shared by every handle and ticket of one gate.
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) options: GateOptions,
    state: Mutex<GateState>,
}

impl Shared {
    pub(crate) fn new(name: String, options: GateOptions) -> Self {
        Shared {
            name,
            options,
            state: Mutex::new(GateState::default()),
        }
    }

    pub(crate) fn state(&self) -> Result<MutexGuard<'_, GateState>, GateError> {
        self.state
            .lock()
            .map_err(|_| GateError::Poisoned(format!("gate '{}'", self.name)))
    }
}
