//! FFI use-case API for host-facing calls.
//!
//! # Responsibility
//! - Expose save/delete/list/check entry points matching the host's
//!   render loop (`onSaveRequested`, `onDeleteRequested`, render, timer).
//! - Keep error semantics simple: every call returns an envelope.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - The host never caches notes; it re-reads `notes_list` after each call.
//! - `reminders_check` records fired reminders before returning them, so a
//!   host that fails to display one will not see it again.

use chrono::Local;
use remindnote_core::db::open_db;
use remindnote_core::reminder::notifier::REMINDER_TITLE;
use remindnote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CoreConfig, Delivery, KvRepository, Note, NoteStore, Notifier, Reminder, ReminderScheduler,
    SqliteKvRepository, StoreError, SystemClock,
};
use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

const NOTES_EMPTY_MESSAGE: &str = "No notes yet. Add one above!";
const EMPTY_TEXT_MESSAGE: &str = "Please write a note before saving.";
const REMINDER_LABEL_PREFIX: &str = "🔔 Reminder: ";
const REMINDER_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";
static CORE_CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Initializes logging from `REMINDNOTE_LOG_LEVEL` / `REMINDNOTE_LOG_DIR`.
///
/// Hosts without their own log directory call this instead of
/// [`init_logging`]. Returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging_from_config() -> String {
    match resolve_config().init_logging() {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Seconds between `reminders_check` calls the host timer should use.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_check_interval_secs() -> u64 {
    resolve_config().check_interval.as_secs()
}

/// One note as shown by the host list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub id: i64,
    pub text: String,
    /// Stored reminder value, unformatted.
    pub reminder: Option<String>,
    /// Display label such as `🔔 Reminder: 2026-10-18 09:30`.
    pub reminder_label: Option<String>,
    pub reminder_fired: bool,
}

/// List response used on every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResponse {
    /// Newest first.
    pub items: Vec<NoteItem>,
    /// Empty-state text when `items` is empty, otherwise a count summary.
    pub message: String,
}

/// Result envelope for save/delete actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteActionResponse {
    pub ok: bool,
    pub note_id: Option<i64>,
    /// Human-readable message; validation failures carry user-facing text.
    pub message: String,
}

impl NoteActionResponse {
    fn success(message: impl Into<String>, note_id: i64) -> Self {
        Self {
            ok: true,
            note_id: Some(note_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            note_id: None,
            message: message.into(),
        }
    }
}

/// Alert the host should display for one fired reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredReminder {
    pub title: String,
    pub body: String,
}

/// Result of one reminder check pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCheckResponse {
    pub ok: bool,
    pub fired: Vec<FiredReminder>,
    /// Notes recorded as fired by this pass.
    pub fired_note_ids: Vec<i64>,
    pub message: String,
}

/// Lists all notes for rendering.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; storage failures render as an empty list.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list() -> NotesListResponse {
    match with_store(|store| list_notes(store)) {
        Ok(response) => response,
        Err(err) => NotesListResponse {
            items: Vec::new(),
            message: format!("notes_list failed: {err}"),
        },
    }
}

/// Saves a note from the host input fields.
///
/// `reminder_value` is the raw reminder input (e.g. `2026-10-18T09:30`);
/// an empty string means no reminder.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the created note id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn note_save(text: String, reminder_value: String) -> NoteActionResponse {
    with_store(|store| save_note(store, text.as_str(), reminder_value.as_str()))
        .unwrap_or_else(|err| NoteActionResponse::failure(format!("note_save failed: {err}")))
}

/// Deletes a note by id. Unknown ids succeed as a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(id: i64) -> NoteActionResponse {
    with_store(|store| delete_note(store, id))
        .unwrap_or_else(|err| NoteActionResponse::failure(format!("note_delete failed: {err}")))
}

/// Runs one reminder check and returns the alerts to display.
///
/// Hosts call this from their repeating timer, every
/// [`reminders_check_interval_secs`] seconds.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_check() -> ReminderCheckResponse {
    let scheduler = ReminderScheduler::from_config(Arc::new(SystemClock), resolve_config());
    with_store(|store| check_reminders(store, &scheduler))
        .unwrap_or_else(|err| ReminderCheckResponse {
            ok: false,
            fired: Vec::new(),
            fired_note_ids: Vec::new(),
            message: format!("reminders_check failed: {err}"),
        })
}

fn list_notes<R: KvRepository>(store: &NoteStore<R>) -> NotesListResponse {
    let items = store.list().into_iter().map(to_note_item).collect::<Vec<_>>();
    let message = if items.is_empty() {
        NOTES_EMPTY_MESSAGE.to_string()
    } else {
        format!("{} note(s).", items.len())
    };
    NotesListResponse { items, message }
}

fn save_note<R: KvRepository>(
    store: &mut NoteStore<R>,
    text: &str,
    reminder_value: &str,
) -> NoteActionResponse {
    match store.create(text, Reminder::from_input(reminder_value)) {
        Ok(note) => NoteActionResponse::success("Note saved.", note.id),
        Err(StoreError::Validation(_)) => NoteActionResponse::failure(EMPTY_TEXT_MESSAGE),
        Err(err) => NoteActionResponse::failure(format!("note_save failed: {err}")),
    }
}

fn delete_note<R: KvRepository>(store: &mut NoteStore<R>, id: i64) -> NoteActionResponse {
    match store.delete(id) {
        Ok(()) => NoteActionResponse::success("Note deleted.", id),
        Err(err) => NoteActionResponse::failure(format!("note_delete failed: {err}")),
    }
}

fn check_reminders<R: KvRepository>(
    store: &mut NoteStore<R>,
    scheduler: &ReminderScheduler,
) -> ReminderCheckResponse {
    let collector = CollectingNotifier::default();
    let report = scheduler.tick(store, &collector);
    let fired = collector
        .bodies
        .into_inner()
        .into_iter()
        .map(|body| FiredReminder {
            title: REMINDER_TITLE.to_string(),
            body,
        })
        .collect::<Vec<_>>();

    let message = if report.mark_failures > 0 {
        format!(
            "{} reminder(s) due; {} could not be recorded.",
            fired.len(),
            report.mark_failures
        )
    } else {
        format!("{} reminder(s) due.", fired.len())
    };
    ReminderCheckResponse {
        ok: report.mark_failures == 0,
        fired,
        fired_note_ids: report.fired,
        message,
    }
}

/// Hands due reminders back to the host instead of alerting directly.
#[derive(Default)]
struct CollectingNotifier {
    bodies: RefCell<Vec<String>>,
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str) -> Delivery {
        self.bodies.borrow_mut().push(message.to_string());
        Delivery::Deferred
    }
}

fn to_note_item(note: Note) -> NoteItem {
    let reminder_label = note.reminder.as_ref().map(reminder_label);
    NoteItem {
        id: note.id,
        text: note.text,
        reminder: note.reminder.map(|reminder| reminder.raw().to_string()),
        reminder_label,
        reminder_fired: note.reminder_fired,
    }
}

fn reminder_label(reminder: &Reminder) -> String {
    let shown = match reminder.instant() {
        Some(at) => at
            .with_timezone(&Local)
            .format(REMINDER_LABEL_FORMAT)
            .to_string(),
        None => reminder.raw().to_string(),
    };
    format!("{REMINDER_LABEL_PREFIX}{shown}")
}

fn resolve_config() -> &'static CoreConfig {
    CORE_CONFIG.get_or_init(|| match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::warn!(
                "event=config_load module=ffi status=error fallback=defaults error={}",
                err
            );
            CoreConfig::default()
        }
    })
}

fn with_store<T>(
    f: impl FnOnce(&mut NoteStore<SqliteKvRepository<'_>>) -> T,
) -> Result<T, String> {
    let conn = open_db(&resolve_config().db_path).map_err(|err| format!("note DB open failed: {err}"))?;
    let repo =
        SqliteKvRepository::try_new(&conn).map_err(|err| format!("note repo init failed: {err}"))?;
    let mut store = NoteStore::new(repo);
    Ok(f(&mut store))
}
