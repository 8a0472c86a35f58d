use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{AwardsBackend, AwardsData, Award, BoardError, Division, PickupStatus};

/// One awardee record held by [`InMemoryAwardsBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Awardee {
    pub awardee_id: u64,
    pub div_id: u64,
    pub place: u32,
    pub name: String,
    pub bib: String,
    pub picked_up: bool,
    pub notes: Option<String>,
    /// Awardee this one replaced, if results changed after awards began.
    pub prev_awardee: Option<u64>,
    pub active: bool,
}

impl Awardee {
    pub fn new(
        awardee_id: u64,
        div_id: u64,
        place: u32,
        name: impl Into<String>,
        bib: impl Into<String>,
    ) -> Self {
        Awardee {
            awardee_id,
            div_id,
            place,
            name: name.into(),
            bib: bib.into(),
            picked_up: false,
            notes: None,
            prev_awardee: None,
            active: true,
        }
    }
}

#[derive(Default)]
struct EventRecord {
    divisions: Vec<Division>,
    awardees: Vec<Awardee>,
}

#[derive(Default)]
struct Store {
    events: HashMap<u64, EventRecord>,
    fail_next: Option<String>,
    calls: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory awards backend for tests and single-process use.
///
/// Mirrors the server's behavior, including division row layout and the
/// previous-awardee rules for pickup toggling. Every call sleeps for the
/// configured latency before touching the store, which lets tests observe
/// whether callers overlap.
#[derive(Default)]
pub struct InMemoryAwardsBackend {
    store: Mutex<Store>,
    latency: Duration,
}

impl InMemoryAwardsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn add_division(&self, event_id: u64, division: Division) {
        self.store()
            .events
            .entry(event_id)
            .or_default()
            .divisions
            .push(division);
    }

    pub fn add_awardee(&self, event_id: u64, awardee: Awardee) {
        self.store()
            .events
            .entry(event_id)
            .or_default()
            .awardees
            .push(awardee);
    }

    /// Replace the active awardee for a place. The new awardee is linked to
    /// the old one only if the old one had already picked up.
    pub fn replace_awardee(&self, event_id: u64, mut awardee: Awardee) {
        let mut store = self.store();
        let event = store.events.entry(event_id).or_default();
        if let Some(old) = event
            .awardees
            .iter_mut()
            .find(|a| a.active && a.div_id == awardee.div_id && a.place == awardee.place)
        {
            old.active = false;
            if old.picked_up {
                awardee.prev_awardee = Some(old.awardee_id);
            }
        }
        event.awardees.push(awardee);
    }

    /// Make the next call fail with the given backend error.
    pub fn fail_next(&self, error: impl Into<String>) {
        self.store().fail_next = Some(error.into());
    }

    pub fn awardee(&self, event_id: u64, awardee_id: u64) -> Option<Awardee> {
        self.store()
            .events
            .get(&event_id)?
            .awardees
            .iter()
            .find(|a| a.awardee_id == awardee_id)
            .cloned()
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.store().calls
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.store().max_in_flight
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        // Store updates never panic midway, so a poisoned guard is still consistent.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn call<T>(
        &self,
        event_id: u64,
        op: impl FnOnce(&mut EventRecord) -> Result<T, BoardError> + Send,
    ) -> Result<T, BoardError> {
        {
            let mut store = self.store();
            store.calls += 1;
            store.in_flight += 1;
            store.max_in_flight = store.max_in_flight.max(store.in_flight);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut store = self.store();
        store.in_flight -= 1;
        if let Some(error) = store.fail_next.take() {
            return Err(BoardError::Backend(error));
        }
        let event = store
            .events
            .get_mut(&event_id)
            .ok_or_else(|| BoardError::Backend("event not found".into()))?;
        op(event)
    }
}

impl EventRecord {
    fn award(&self, awardee: &Awardee, division: &Division) -> Award {
        let prev_picked_up = match awardee.prev_awardee {
            Some(prev) if !awardee.picked_up => self
                .awardees
                .iter()
                .find(|a| a.awardee_id == prev)
                .map(|a| a.picked_up)
                .unwrap_or(false),
            _ => false,
        };
        Award {
            awardee_id: awardee.awardee_id,
            div_id: division.div_id,
            rsu_div_id: division.rsu_div_id,
            place: awardee.place,
            name: awardee.name.clone(),
            bib: awardee.bib.clone(),
            picked_up: awardee.picked_up,
            prev_picked_up,
            notes: awardee.notes.clone(),
        }
    }

    fn snapshot(&self, need_divisions: bool) -> AwardsData {
        let mut divisions: Vec<&Division> = self.divisions.iter().collect();
        divisions.sort_by_key(|d| d.prio.unwrap_or(u32::MAX));

        let mut awards = Vec::new();
        for division in &divisions {
            let mut holders: Vec<&Awardee> = self
                .awardees
                .iter()
                .filter(|a| a.active && a.div_id == division.div_id)
                .collect();
            holders.sort_by_key(|a| a.place);
            awards.extend(holders.into_iter().map(|a| self.award(a, division)));
        }

        AwardsData {
            divisions: need_divisions.then(|| division_rows(&divisions)),
            awards,
        }
    }

    fn awardee_mut(&mut self, awardee_id: u64) -> Option<&mut Awardee> {
        self.awardees
            .iter_mut()
            .find(|a| a.awardee_id == awardee_id)
    }
}

/// Group divisions into one column per gender (in order of first
/// appearance) and zip the columns into rows padded with `None`.
fn division_rows(divisions: &[&Division]) -> Vec<Vec<Option<Division>>> {
    let mut columns: Vec<(Option<&str>, Vec<&Division>)> = Vec::new();
    for &division in divisions {
        let gender = division.gender.as_deref();
        match columns.iter_mut().find(|(g, _)| *g == gender) {
            Some((_, column)) => column.push(division),
            None => columns.push((gender, vec![division])),
        }
    }

    let depth = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
    (0..depth)
        .map(|row| {
            columns
                .iter()
                .map(|(_, column)| column.get(row).map(|d| (*d).clone()))
                .collect()
        })
        .collect()
}

impl AwardsBackend for InMemoryAwardsBackend {
    async fn fetch_awards(
        &self,
        event_id: u64,
        need_divisions: bool,
    ) -> Result<AwardsData, BoardError> {
        self.call(event_id, |event| Ok(event.snapshot(need_divisions)))
            .await
    }

    async fn set_picked_up(
        &self,
        event_id: u64,
        awardee_id: u64,
        was_picked_up: bool,
    ) -> Result<PickupStatus, BoardError> {
        self.call(event_id, |event| {
            let Some(awardee) = event.awardee_mut(awardee_id) else {
                return Ok(PickupStatus::default());
            };
            awardee.picked_up = !was_picked_up;
            Ok(PickupStatus {
                picked_up: awardee.picked_up,
                prev_picked_up: !awardee.picked_up && awardee.prev_awardee.is_some(),
            })
        })
        .await
    }

    async fn fetch_notes(&self, event_id: u64, awardee_id: u64) -> Result<String, BoardError> {
        self.call(event_id, |event| {
            event
                .awardee_mut(awardee_id)
                .map(|a| a.notes.clone().unwrap_or_default())
                .ok_or_else(|| BoardError::Backend("no awardee".into()))
        })
        .await
    }

    async fn save_notes(
        &self,
        event_id: u64,
        awardee_id: u64,
        notes: &str,
    ) -> Result<String, BoardError> {
        self.call(event_id, |event| {
            let awardee = event
                .awardee_mut(awardee_id)
                .ok_or_else(|| BoardError::Backend("no awardee".into()))?;
            awardee.notes = Some(notes.to_string());
            Ok(notes.to_string())
        })
        .await
    }
}
