use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{Award, AwardsBackend, BoardConfig, BoardError, Division, PickupStatus};
use crate::gate::{GateError, MutexGate};

/// English ordinal suffix for a place number (`1st`, `2nd`, `11th`, `23rd`).
pub fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Identifies one award place on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub rsu_div_id: u64,
    pub place: u32,
}

impl CellKey {
    pub fn new(rsu_div_id: u64, place: u32) -> Self {
        CellKey { rsu_div_id, place }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.rsu_div_id, self.place)
    }
}

/// Displayed state of one award place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwardCell {
    pub div_id: u64,
    pub header: String,
    pub awardee_id: Option<u64>,
    pub bib: Option<String>,
    pub name: Option<String>,
    pub picked_up: bool,
    pub prev_picked_up: bool,
    pub notes: Option<String>,
}

/// The note editor, open over one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEditor {
    pub cell: CellKey,
    pub text: String,
}

/// Everything the board displays.
///
/// `rows` holds, per row, the division groups in that row and, per group,
/// the cells for each award place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwardsView {
    pub event_id: Option<u64>,
    pub divisions_rendered: bool,
    pub rows: Vec<Vec<Vec<CellKey>>>,
    pub cells: BTreeMap<CellKey, AwardCell>,
    pub note_editor: Option<NoteEditor>,
}

impl AwardsView {
    pub fn cell(&self, key: &CellKey) -> Option<&AwardCell> {
        self.cells.get(key)
    }

    fn render_divisions(&mut self, rows: &[Vec<Option<Division>>]) {
        self.rows.clear();
        self.cells.clear();
        for row in rows {
            let mut groups = Vec::new();
            for division in row.iter().flatten() {
                let mut group = Vec::new();
                for place in 1..=division.num_awards {
                    let key = CellKey::new(division.rsu_div_id, place);
                    self.cells.insert(
                        key,
                        AwardCell {
                            div_id: division.div_id,
                            header: format!("{}{} {}", place, ordinal_suffix(place), division.name),
                            ..AwardCell::default()
                        },
                    );
                    group.push(key);
                }
                groups.push(group);
            }
            self.rows.push(groups);
        }
        self.divisions_rendered = true;
    }

    /// Returns false when the award has no cell on the board.
    fn apply_award(&mut self, award: &Award) -> bool {
        let Some(cell) = self.cells.get_mut(&CellKey::new(award.rsu_div_id, award.place)) else {
            return false;
        };
        cell.awardee_id = Some(award.awardee_id);
        cell.bib = Some(award.bib.clone());
        cell.name = Some(award.name.clone());
        cell.picked_up = award.picked_up;
        cell.prev_picked_up = award.prev_picked_up;
        cell.notes = award.notes.clone().filter(|n| !n.is_empty());
        true
    }

    fn apply_pickup(&mut self, key: &CellKey, status: PickupStatus) {
        if let Some(cell) = self.cells.get_mut(key) {
            cell.picked_up = status.picked_up;
            cell.prev_picked_up = status.prev_picked_up;
        }
    }

    fn apply_notes(&mut self, key: &CellKey, notes: &str) {
        if let Some(cell) = self.cells.get_mut(key) {
            cell.notes = (!notes.is_empty()).then(|| notes.to_string());
        }
    }
}

/// Awards check-in board.
///
/// The view is shared by the periodic refresh and by user actions; every
/// operation that reads the backend and writes the view runs under the
/// board's gate, so those multi-step sequences never interleave.
pub struct AwardsBoard<B> {
    backend: B,
    gate: MutexGate,
    view: Mutex<AwardsView>,
}

impl<B: AwardsBackend> AwardsBoard<B> {
    pub fn new(backend: B, gate: MutexGate) -> Self {
        AwardsBoard {
            backend,
            gate,
            view: Mutex::new(AwardsView::default()),
        }
    }

    /// Build a board with its own gate and the configured event preselected.
    pub fn from_config(backend: B, config: &BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        let board = Self::new(backend, MutexGate::new(config.gate_name.clone(), config.gate)?);
        board.with_view(|view| view.event_id = config.event_id)?;
        Ok(board)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn gate(&self) -> &MutexGate {
        &self.gate
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> Result<AwardsView, BoardError> {
        self.with_view(|view| view.clone())
    }

    /// Switch to another event. The division layout is rebuilt on the next
    /// refresh.
    pub async fn select_event(&self, event_id: u64) -> Result<(), BoardError> {
        self.gate
            .with_lock(move || async move {
                self.with_view(|view| {
                    *view = AwardsView {
                        event_id: Some(event_id),
                        ..AwardsView::default()
                    };
                })
            })
            .await
    }

    /// Fetch the current awards and bring the view up to date.
    pub async fn refresh(&self) -> Result<(), BoardError> {
        self.gate
            .with_lock(move || async move {
                let (event_id, need_divisions) =
                    self.with_view(|view| (view.event_id, !view.divisions_rendered))?;
                let event_id = event_id.ok_or(BoardError::NoEvent)?;

                let data = self.backend.fetch_awards(event_id, need_divisions).await?;

                self.with_view(|view| {
                    if need_divisions {
                        view.render_divisions(data.divisions.as_deref().unwrap_or_default());
                    }
                    for award in &data.awards {
                        if !view.apply_award(award) {
                            debug!(cell = %CellKey::new(award.rsu_div_id, award.place), "award has no cell");
                        }
                    }
                })
            })
            .await
    }

    /// Flip the picked-up flag of the award in `key`.
    ///
    /// Returns `None` without touching the gate when the cell has no awardee.
    /// The awardee is looked up again once the gate is held, since a refresh
    /// ahead in the queue may have replaced it.
    pub async fn toggle_picked_up(&self, key: CellKey) -> Result<Option<PickupStatus>, BoardError> {
        if self.awardee_at(&key)?.is_none() {
            return Ok(None);
        }

        self.gate
            .with_lock(move || async move {
                let (event_id, current) = self.with_view(|view| {
                    let current = view
                        .cell(&key)
                        .and_then(|c| Some((c.awardee_id?, c.picked_up)));
                    (view.event_id, current)
                })?;
                let event_id = event_id.ok_or(BoardError::NoEvent)?;
                let Some((awardee_id, was_picked_up)) = current else {
                    return Ok(None);
                };

                let status = self
                    .backend
                    .set_picked_up(event_id, awardee_id, was_picked_up)
                    .await?;

                self.with_view(|view| view.apply_pickup(&key, status))?;
                Ok::<_, BoardError>(Some(status))
            })
            .await
    }

    /// Load the notes for `key` and open the note editor over it.
    ///
    /// Returns `None` without touching the gate when the cell has no awardee.
    pub async fn open_note(&self, key: CellKey) -> Result<Option<String>, BoardError> {
        if self.awardee_at(&key)?.is_none() {
            return Ok(None);
        }

        self.gate
            .with_lock(move || async move {
                let event_id = self.event_id()?;
                let Some(awardee_id) = self.awardee_at(&key)? else {
                    return Ok(None);
                };
                let notes = self.backend.fetch_notes(event_id, awardee_id).await?;
                self.with_view(|view| {
                    view.note_editor = Some(NoteEditor {
                        cell: key,
                        text: notes.clone(),
                    });
                })?;
                Ok::<_, BoardError>(Some(notes))
            })
            .await
    }

    /// Save `text` (trimmed) as the notes of the cell the editor is open over.
    ///
    /// The editor closes whether or not the save succeeds.
    pub async fn save_note(&self, text: &str) -> Result<String, BoardError> {
        if self.note_target()?.is_none() {
            return Err(BoardError::NoNoteOpen);
        }

        let result = self
            .gate
            .with_lock(move || async move {
                let event_id = self.event_id()?;
                let Some((key, awardee_id)) = self.note_target()? else {
                    self.with_view(|view| view.note_editor = None)?;
                    return Err(BoardError::NoNoteOpen);
                };
                let saved = self.backend.save_notes(event_id, awardee_id, text.trim()).await;
                self.with_view(|view| {
                    view.note_editor = None;
                    if let Ok(notes) = &saved {
                        view.apply_notes(&key, notes);
                    }
                })?;
                saved
            })
            .await;

        if let Err(BoardError::Gate(_)) = &result {
            self.with_view(|view| view.note_editor = None)?;
        }
        result
    }

    /// Cell and awardee the note editor is open over.
    fn note_target(&self) -> Result<Option<(CellKey, u64)>, BoardError> {
        self.with_view(|view| {
            let key = view.note_editor.as_ref()?.cell;
            let awardee_id = view.cell(&key)?.awardee_id?;
            Some((key, awardee_id))
        })
    }

    fn event_id(&self) -> Result<u64, BoardError> {
        self.with_view(|view| view.event_id)?
            .ok_or(BoardError::NoEvent)
    }

    fn awardee_at(&self, key: &CellKey) -> Result<Option<u64>, BoardError> {
        self.with_view(|view| view.cell(key).and_then(|c| c.awardee_id))
    }

    fn with_view<T>(&self, f: impl FnOnce(&mut AwardsView) -> T) -> Result<T, BoardError> {
        let mut view: MutexGuard<'_, AwardsView> = self
            .view
            .lock()
            .map_err(|_| GateError::Poisoned("awards view".into()))?;
        Ok(f(&mut view))
    }
}
