//! Note store use-case API.
//!
//! # Responsibility
//! - Own the authoritative, newest-first note collection.
//! - Persist the collection as one JSON array under the `notes` key.
//!
//! # Invariants
//! - Reads never fail: missing, unreadable or non-array payloads load as an
//!   empty collection; malformed entries are skipped one by one.
//! - Validation happens before any read or write, so a rejected create
//!   leaves storage untouched.
//! - Assigned ids are strictly greater than every id already stored.
//! - `reminder_fired` is only flipped through `mark_fired`.

use crate::clock::{Clock, SystemClock};
use crate::model::note::{normalize_note_text, Note, NoteId, NoteValidationError, Reminder};
use crate::repo::kv_repo::{KvRepository, RepoError};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Storage key holding the serialized note array.
pub const NOTES_KEY: &str = "notes";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error for note mutations.
#[derive(Debug)]
pub enum StoreError {
    /// Input rejected before any state change.
    Validation(NoteValidationError),
    /// Backing storage rejected the write.
    Repo(RepoError),
    /// Collection could not be encoded as JSON.
    Encode(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode notes: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<NoteValidationError> for StoreError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Durable note collection over a key-value repository.
pub struct NoteStore<R: KvRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: KvRepository> NoteStore<R> {
    /// Creates a store reading ids from the wall clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    /// Creates a store with an injected time source.
    pub fn with_clock(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Returns all notes, newest first.
    pub fn list(&self) -> Vec<Note> {
        self.load()
    }

    /// Gets one note by id.
    pub fn get(&self, id: NoteId) -> Option<Note> {
        self.load().into_iter().find(|note| note.id == id)
    }

    /// Creates a note and prepends it to the collection.
    ///
    /// # Errors
    /// - `StoreError::Validation` when `text` is blank after trimming.
    /// - `StoreError::Repo` when the collection cannot be written.
    pub fn create(&mut self, text: &str, reminder: Option<Reminder>) -> StoreResult<Note> {
        let text = normalize_note_text(text)?;
        let mut notes = self.load();
        let id = next_note_id(&notes, self.clock.now());
        let note = Note::new(id, text.as_str(), reminder)?;

        notes.insert(0, note.clone());
        self.save(&notes)?;

        info!(
            "event=note_create module=store status=ok note_id={} has_reminder={} total={}",
            note.id,
            note.reminder.is_some(),
            notes.len()
        );
        Ok(note)
    }

    /// Removes the note with `id`. Missing ids are a no-op.
    pub fn delete(&mut self, id: NoteId) -> StoreResult<()> {
        let mut notes = self.load();
        let before = notes.len();
        notes.retain(|note| note.id != id);
        if notes.len() == before {
            info!("event=note_delete module=store status=skipped note_id={id} reason=not_found");
            return Ok(());
        }

        self.save(&notes)?;
        info!(
            "event=note_delete module=store status=ok note_id={id} total={}",
            notes.len()
        );
        Ok(())
    }

    /// Flags the reminder of `id` as fired.
    ///
    /// Returns `Ok(false)` without writing when the note is missing or was
    /// already fired.
    pub fn mark_fired(&mut self, id: NoteId) -> StoreResult<bool> {
        let mut notes = self.load();
        let changed = notes
            .iter_mut()
            .find(|note| note.id == id)
            .is_some_and(Note::mark_fired);
        if !changed {
            return Ok(false);
        }

        self.save(&notes)?;
        info!("event=reminder_mark_fired module=store status=ok note_id={id}");
        Ok(true)
    }

    fn load(&self) -> Vec<Note> {
        let raw = match self.repo.get_item(NOTES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(
                    "event=notes_load module=store status=error error_code=storage_read_failed error={}",
                    err
                );
                return Vec::new();
            }
        };

        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "event=notes_load module=store status=error error_code=corrupt_payload bytes={} error={}",
                    raw.len(),
                    err
                );
                return Vec::new();
            }
        };

        let total = entries.len();
        let notes = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Note>(entry) {
                Ok(note) => Some(note),
                Err(err) => {
                    warn!(
                        "event=notes_load module=store status=skipped error_code=corrupt_entry index={} error={}",
                        index, err
                    );
                    None
                }
            })
            .collect::<Vec<_>>();
        if notes.len() < total {
            warn!(
                "event=notes_load module=store status=partial loaded={} skipped={}",
                notes.len(),
                total - notes.len()
            );
        }
        notes
    }

    fn save(&mut self, notes: &[Note]) -> StoreResult<()> {
        let payload = serde_json::to_string(notes)?;
        if let Err(err) = self.repo.set_item(NOTES_KEY, payload.as_str()) {
            error!(
                "event=notes_save module=store status=error error_code=storage_write_failed count={} error={}",
                notes.len(),
                err
            );
            return Err(err.into());
        }
        Ok(())
    }
}

fn next_note_id(notes: &[Note], now: DateTime<Utc>) -> NoteId {
    let candidate = now.timestamp_millis();
    match notes.iter().map(|note| note.id).max() {
        Some(max) if max >= candidate => max.saturating_add(1),
        _ => candidate,
    }
}
