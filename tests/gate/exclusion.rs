//! Mutual exclusion and FIFO ordering across many concurrent callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mutex_gate::{GateError, GateStatus, MutexGate};
use tokio::time::sleep;

use crate::support::gate;

/// Small deterministic generator so interleavings vary per seed.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

async fn protected_cycle(
    gate: MutexGate,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    start_delay: Duration,
    steps: Vec<Duration>,
) -> Result<(), GateError> {
    sleep(start_delay).await;
    let mut ticket = gate.acquire().await?;
    ticket.lock()?;

    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
    max_active.fetch_max(now, Ordering::SeqCst);
    for step in steps {
        // Every await is a point where other callers get to run.
        sleep(step).await;
        assert_eq!(active.load(Ordering::SeqCst), 1);
    }
    active.fetch_sub(1, Ordering::SeqCst);

    ticket.unlock()
}

#[tokio::test(start_paused = true)]
async fn at_most_one_holder_for_randomized_interleavings() {
    for seed in 1..=20u64 {
        let gate = gate(60_000);
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let mut rng = Lcg(seed);

        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let start_delay = Duration::from_millis(rng.next(50));
                let steps = (0..rng.next(4) + 1)
                    .map(|_| Duration::from_millis(rng.next(20)))
                    .collect();
                tokio::spawn(protected_cycle(
                    gate.clone(),
                    Arc::clone(&active),
                    Arc::clone(&max_active),
                    start_delay,
                    steps,
                ))
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1, "seed {}", seed);
        assert_eq!(gate.status().unwrap(), GateStatus::Free);
        assert_eq!(gate.queued().unwrap(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn requests_granted_in_arrival_order() {
    let gate = gate(60_000);
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut holder = gate.acquire().await.unwrap();
    holder.lock().unwrap();

    let tasks: Vec<_> = (0..6u64)
        .map(|i| {
            let gate = gate.clone();
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                // Arrive one millisecond apart, in index order.
                sleep(Duration::from_millis(i + 1)).await;
                let mut ticket = gate.acquire().await?;
                ticket.lock()?;
                order.lock().unwrap().push(i);
                sleep(Duration::from_millis(5)).await;
                ticket.unlock()
            })
        })
        .collect();

    sleep(Duration::from_millis(20)).await;
    assert_eq!(gate.queued().unwrap(), 6);
    holder.unlock().unwrap();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn unlock_hands_over_without_freeing() {
    let gate = gate(1000);

    let mut a = gate.acquire().await.unwrap();
    a.lock().unwrap();

    let b_gate = gate.clone();
    let b = tokio::spawn(async move { b_gate.acquire().await });
    sleep(Duration::from_millis(1)).await;

    a.unlock().unwrap();
    assert_eq!(gate.status().unwrap(), GateStatus::Held);
    assert_eq!(gate.queued().unwrap(), 0);

    let mut b = b.await.unwrap().unwrap();
    b.lock().unwrap();
    b.unlock().unwrap();
    assert_eq!(gate.status().unwrap(), GateStatus::Free);
}

#[tokio::test(start_paused = true)]
async fn independent_gates_do_not_interact() {
    let first = gate(100);
    let second = gate(100);

    let mut a = first.acquire().await.unwrap();
    a.lock().unwrap();

    let mut b = second.acquire().await.unwrap();
    b.lock().unwrap();

    assert!(first.is_locked().unwrap());
    assert!(second.is_locked().unwrap());
    a.unlock().unwrap();
    b.unlock().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_acquires_on_worker_threads_are_timeouts() {
    // Timeouts this short keep waiters expiring while holders unlock on
    // other threads.
    let gate = gate(2);
    let active = Arc::new(AtomicUsize::new(0));
    let granted = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let gate = gate.clone();
            let active = Arc::clone(&active);
            let granted = Arc::clone(&granted);
            tokio::spawn(async move {
                let mut failures = Vec::new();
                for _ in 0..50 {
                    match gate.acquire().await {
                        Ok(mut ticket) => {
                            ticket.lock().unwrap();
                            assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                            granted.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            active.fetch_sub(1, Ordering::SeqCst);
                            ticket.unlock().unwrap();
                        }
                        Err(err) => failures.push(err),
                    }
                }
                failures
            })
        })
        .collect();

    for task in tasks {
        for err in task.await.unwrap() {
            assert!(err.is_timeout(), "unexpected error: {}", err);
        }
    }

    assert!(granted.load(Ordering::SeqCst) > 0);
    assert_eq!(gate.status().unwrap(), GateStatus::Free);
    assert_eq!(gate.queued().unwrap(), 0);
}
