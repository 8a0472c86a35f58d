//! Periodic refresh of an awards board.
//!
//! `AwardsPoller` spawns a ticker task that starts a refresh cycle right away
//! and then once per poll period. Each cycle runs as its own task, so a slow
//! cycle does not delay the next tick; overlapping cycles queue on the
//! board's gate instead of racing on the view.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{AwardsBackend, AwardsBoard};

/// Statistics from the poller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollStats {
    /// Refresh cycles started (one per tick).
    pub cycles_started: usize,
    pub cycles_succeeded: usize,
    /// Cycles that failed for a reason other than a gate timeout.
    pub cycles_failed: usize,
    /// Cycles that gave up waiting for the gate.
    pub cycles_timed_out: usize,
}

/// Background refresh loop for an [`AwardsBoard`].
///
/// ## Example
///
/// ```ignore
/// let board = Arc::new(AwardsBoard::from_config(backend, &config)?);
/// let poller = AwardsPoller::start(Arc::clone(&board), config.poll_period());
///
/// // ... user actions call board.toggle_picked_up(..) etc ...
///
/// let stats = poller.stop().await;
/// ```
pub struct AwardsPoller {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Vec<JoinHandle<()>>>>,
    stats: Arc<Mutex<PollStats>>,
}

impl AwardsPoller {
    /// Start polling. Must be called from within a tokio runtime.
    pub fn start<B>(board: Arc<AwardsBoard<B>>, period: Duration) -> Self
    where
        B: AwardsBackend + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let stats = Arc::new(Mutex::new(PollStats::default()));
        let ticker_stats = Arc::clone(&stats);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut cycles: Vec<JoinHandle<()>> = Vec::new();

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        cycles.retain(|cycle| !cycle.is_finished());
                        record(&ticker_stats, |s| s.cycles_started += 1);
                        cycles.push(tokio::spawn(run_cycle(
                            Arc::clone(&board),
                            Arc::clone(&ticker_stats),
                        )));
                    }
                }
            }

            debug!(in_flight = cycles.len(), "awards poller stopped");
            cycles
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            stats,
        }
    }

    /// Statistics so far.
    pub fn stats(&self) -> PollStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Stop ticking, wait for cycles already started, and return the
    /// final statistics.
    pub async fn stop(mut self) -> PollStats {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            if let Ok(cycles) = handle.await {
                for cycle in cycles {
                    let _ = cycle.await;
                }
            }
        }
        self.stats()
    }

    /// Signal the poller to stop without waiting.
    pub fn signal_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for AwardsPoller {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

async fn run_cycle<B: AwardsBackend>(board: Arc<AwardsBoard<B>>, stats: Arc<Mutex<PollStats>>) {
    match board.refresh().await {
        Ok(()) => record(&stats, |s| s.cycles_succeeded += 1),
        Err(err) if err.is_timeout() => {
            warn!(gate = %board.gate().name(), error = %err, "awards refresh skipped");
            record(&stats, |s| s.cycles_timed_out += 1);
        }
        Err(err) => {
            warn!(error = %err, "awards refresh failed");
            record(&stats, |s| s.cycles_failed += 1);
        }
    }
}

fn record(stats: &Mutex<PollStats>, update: impl FnOnce(&mut PollStats)) {
    if let Ok(mut stats) = stats.lock() {
        update(&mut stats);
    }
}
