use std::future::Future;

use super::{AwardsData, BoardError, PickupStatus};

/// Server endpoints the awards board talks to.
///
/// Every call is one network round-trip in production. The board never calls
/// a backend method without holding its gate, so implementations need no
/// ordering of their own.
pub trait AwardsBackend: Send + Sync {
    /// Current awards for an event, plus the division layout when
    /// `need_divisions` is set.
    fn fetch_awards(
        &self,
        event_id: u64,
        need_divisions: bool,
    ) -> impl Future<Output = Result<AwardsData, BoardError>> + Send;

    /// Flip an award's picked-up flag. `was_picked_up` is the state the
    /// caller last displayed.
    fn set_picked_up(
        &self,
        event_id: u64,
        awardee_id: u64,
        was_picked_up: bool,
    ) -> impl Future<Output = Result<PickupStatus, BoardError>> + Send;

    fn fetch_notes(
        &self,
        event_id: u64,
        awardee_id: u64,
    ) -> impl Future<Output = Result<String, BoardError>> + Send;

    /// Store notes for an awardee and return what was stored.
    fn save_notes(
        &self,
        event_id: u64,
        awardee_id: u64,
        notes: &str,
    ) -> impl Future<Output = Result<String, BoardError>> + Send;
}
