//! Timing scenarios with a paused clock.

use std::time::Duration;

use mutex_gate::{GateError, GateStatus};
use tokio::time::{sleep, Instant};

use crate::support::gate;

fn assert_near(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

// ============================================================================
// Holder unlocks before the waiter's timeout
// ============================================================================

#[tokio::test(start_paused = true)]
async fn waiter_granted_at_unlock_not_before() {
    let gate = gate(1000);
    let start = Instant::now();

    let mut a = gate.acquire().await.unwrap();
    a.lock().unwrap();

    let b_gate = gate.clone();
    let b = tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        let ticket = b_gate.acquire().await;
        (ticket, Instant::now())
    });

    sleep(Duration::from_millis(500)).await;
    assert!(!b.is_finished(), "B must still be pending at t=500");
    assert_eq!(gate.queued().unwrap(), 1);
    assert_eq!(gate.status().unwrap(), GateStatus::Held);

    sleep(Duration::from_millis(100)).await;
    a.unlock().unwrap();

    let (ticket, granted_at) = b.await.unwrap();
    let mut ticket = ticket.expect("B is granted before its 1100 ms deadline");
    assert_near(granted_at - start, 600);

    ticket.lock().unwrap();
    ticket.unlock().unwrap();
    assert_eq!(gate.status().unwrap(), GateStatus::Free);
}

// ============================================================================
// Holder never unlocks
// ============================================================================

#[tokio::test(start_paused = true)]
async fn waiter_times_out_and_holder_keeps_gate() {
    let gate = gate(200);
    let start = Instant::now();

    let mut a = gate.acquire().await.unwrap();
    a.lock().unwrap();

    let err = gate.acquire().await.unwrap_err();
    assert!(matches!(err, GateError::Timeout { .. }));
    assert_near(start.elapsed(), 200);

    // No auto-release of the holder, however long it keeps the lock.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(gate.status().unwrap(), GateStatus::Held);
    assert!(a.is_locked());
    assert_eq!(gate.queued().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_request_is_never_granted_later() {
    let gate = gate(100);

    let mut a = gate.acquire().await.unwrap();
    a.lock().unwrap();

    let b_gate = gate.clone();
    let b = tokio::spawn(async move { b_gate.acquire().await });

    sleep(Duration::from_millis(150)).await;
    assert!(b.await.unwrap().unwrap_err().is_timeout());

    a.unlock().unwrap();

    // The slot went nowhere: the gate is free and a fresh request is
    // granted at once.
    assert_eq!(gate.status().unwrap(), GateStatus::Free);
    let start = Instant::now();
    let mut c = gate.acquire().await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
    c.lock().unwrap();
    c.unlock().unwrap();
}

#[tokio::test(start_paused = true)]
async fn unlock_at_the_deadline_loses_no_slot() {
    let gate = gate(100);

    let mut a = gate.acquire().await.unwrap();
    a.lock().unwrap();

    // The waiter's deadline and the holder's unlock land on the same tick.
    let b_gate = gate.clone();
    let b = tokio::spawn(async move { b_gate.acquire().await });
    sleep(Duration::from_millis(100)).await;
    a.unlock().unwrap();

    match b.await.unwrap() {
        Ok(mut ticket) => {
            ticket.lock().unwrap();
            ticket.unlock().unwrap();
        }
        Err(err) => assert!(err.is_timeout(), "unexpected error: {}", err),
    }

    assert_eq!(gate.status().unwrap(), GateStatus::Free);
    assert_eq!(gate.queued().unwrap(), 0);
    let start = Instant::now();
    let mut c = gate.acquire().await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
    c.lock().unwrap();
    c.unlock().unwrap();
}

#[tokio::test(start_paused = true)]
async fn timeout_only_bounds_the_wait_not_the_hold() {
    let gate = gate(100);

    let mut a = gate.acquire().await.unwrap();
    a.lock().unwrap();
    sleep(Duration::from_millis(500)).await;

    // Well past the timeout, the holder can still unlock normally.
    a.unlock().unwrap();
    assert_eq!(gate.status().unwrap(), GateStatus::Free);
}

// ============================================================================
// Holder fails inside the protected section
// ============================================================================

#[derive(Debug, PartialEq)]
enum AppError {
    Gate(GateError),
    UpdateFailed,
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        AppError::Gate(err)
    }
}

#[tokio::test(start_paused = true)]
async fn waiter_granted_after_holder_error() {
    let gate = gate(1000);

    let a_gate = gate.clone();
    let a = tokio::spawn(async move {
        a_gate
            .with_lock(|| async {
                sleep(Duration::from_millis(50)).await;
                Err::<(), _>(AppError::UpdateFailed)
            })
            .await
    });

    let b_gate = gate.clone();
    let b = tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        let mut ticket = b_gate.acquire().await?;
        ticket.lock()?;
        let granted_at = Instant::now();
        ticket.unlock()?;
        Ok::<_, GateError>(granted_at)
    });

    let start = Instant::now();
    assert_eq!(a.await.unwrap(), Err(AppError::UpdateFailed));
    let granted_at = b.await.unwrap().unwrap();
    assert_near(granted_at - start, 50);
    assert_eq!(gate.status().unwrap(), GateStatus::Free);
}

#[tokio::test(start_paused = true)]
async fn waiter_granted_after_holder_panics() {
    let gate = gate(1000);

    let a_gate = gate.clone();
    let a = tokio::spawn(async move {
        a_gate
            .with_lock(|| async {
                sleep(Duration::from_millis(50)).await;
                let explode = true;
                if explode {
                    panic!("update cycle crashed");
                }
                Ok::<(), GateError>(())
            })
            .await
    });

    let b_gate = gate.clone();
    let b = tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        b_gate.acquire().await
    });

    sleep(Duration::from_millis(20)).await;
    assert_eq!(gate.queued().unwrap(), 1);

    assert!(a.await.unwrap_err().is_panic());
    let mut ticket = b.await.unwrap().unwrap();
    ticket.lock().unwrap();
    ticket.unlock().unwrap();
    assert_eq!(gate.status().unwrap(), GateStatus::Free);
}
