use chrono::{Duration, TimeZone, Utc};
use remindnote_core::db::{open_db, open_db_in_memory};
use remindnote_core::{
    Clock, KvRepository, ManualClock, MemoryKvRepository, NoteStore, NoteValidationError, Reminder,
    RepoError, RepoResult, SqliteKvRepository, StoreError, NOTES_KEY,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Memory repository whose reads and/or writes can be made to fail.
struct FailingKvRepository {
    inner: MemoryKvRepository,
    fail_reads: bool,
    fail_writes: bool,
}

impl FailingKvRepository {
    fn seeded(payload: &str, fail_reads: bool, fail_writes: bool) -> Self {
        let mut inner = MemoryKvRepository::new();
        inner.set_item(NOTES_KEY, payload).unwrap();
        Self {
            inner,
            fail_reads,
            fail_writes,
        }
    }
}

impl KvRepository for FailingKvRepository {
    fn get_item(&self, key: &str) -> RepoResult<Option<String>> {
        if self.fail_reads {
            return Err(RepoError::MissingRequiredTable("kv_store"));
        }
        self.inner.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> RepoResult<()> {
        if self.fail_writes {
            return Err(RepoError::MissingRequiredTable("kv_store"));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> RepoResult<()> {
        if self.fail_writes {
            return Err(RepoError::MissingRequiredTable("kv_store"));
        }
        self.inner.remove_item(key)
    }
}

const TWO_NOTES: &str = r#"[
    {"id": 2, "text": "second", "reminder": "2020-01-01T00:00:00Z", "reminderFired": false},
    {"id": 1, "text": "first", "reminder": null, "reminderFired": false}
]"#;

fn manual_store() -> (NoteStore<MemoryKvRepository>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(),
    ));
    let store = NoteStore::with_clock(MemoryKvRepository::new(), clock.clone());
    (store, clock)
}

#[test]
fn create_then_list_contains_one_new_unfired_note() {
    let (mut store, _) = manual_store();
    let created = store.create("  Buy milk  ", None).unwrap();

    let listed = store.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], created);
    assert_eq!(listed[0].text, "Buy milk");
    assert!(!listed[0].reminder_fired);
}

#[test]
fn blank_text_is_rejected_without_state_change() {
    let (mut store, _) = manual_store();
    store.create("keep me", None).unwrap();
    let before = store.list();

    for text in ["", "   ", "\n\t"] {
        let err = store.create(text, None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(NoteValidationError::EmptyText)
        ));
    }
    assert_eq!(store.list(), before);
}

#[test]
fn rejected_create_does_not_touch_storage() {
    let mut store = NoteStore::new(MemoryKvRepository::new());
    store.create("", None).unwrap_err();
    assert!(store.list().is_empty());
}

#[test]
fn list_is_newest_first_with_unique_increasing_ids() {
    let (mut store, clock) = manual_store();
    let first = store.create("first", None).unwrap();
    let second = store.create("second", None).unwrap();
    clock.advance(Duration::seconds(1));
    let third = store.create("third", None).unwrap();

    assert!(second.id > first.id);
    assert!(third.id > second.id);
    let texts: Vec<String> = store.list().into_iter().map(|note| note.text).collect();
    assert_eq!(texts, vec!["third", "second", "first"]);
}

#[test]
fn delete_removes_note_and_ignores_unknown_ids() {
    let (mut store, _) = manual_store();
    let keep = store.create("keep", None).unwrap();
    let drop = store.create("drop", None).unwrap();

    store.delete(drop.id).unwrap();
    store.delete(drop.id).unwrap();
    store.delete(424_242).unwrap();

    let listed = store.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keep.id);
    assert!(store.get(drop.id).is_none());
}

#[test]
fn mark_fired_is_idempotent() {
    let (mut store, clock) = manual_store();
    let note = store
        .create("call mom", Some(Reminder::at(clock.now())))
        .unwrap();

    assert!(store.mark_fired(note.id).unwrap());
    let once = store.list();
    assert!(!store.mark_fired(note.id).unwrap());
    assert_eq!(store.list(), once);
    assert!(once[0].reminder_fired);

    assert!(!store.mark_fired(9_999).unwrap());
}

#[test]
fn persisted_layout_matches_wire_format() {
    let conn = open_db_in_memory().unwrap();
    let start = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let mut store =
        NoteStore::with_clock(SqliteKvRepository::try_new(&conn).unwrap(), clock.clone());

    let at = Utc.with_ymd_and_hms(2026, 10, 18, 10, 30, 0).unwrap();
    store.create("plain", None).unwrap();
    clock.advance(Duration::milliseconds(5));
    store.create("timed", Some(Reminder::at(at))).unwrap();

    let payload: String = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1;",
            [NOTES_KEY],
            |row| row.get(0),
        )
        .unwrap();
    let value: Value = serde_json::from_str(&payload).unwrap();
    let base_id = start.timestamp_millis();
    assert_eq!(
        value,
        json!([
            {
                "id": base_id + 5,
                "text": "timed",
                "reminder": "2026-10-18T10:30:00.000Z",
                "reminderFired": false
            },
            {
                "id": base_id,
                "text": "plain",
                "reminder": null,
                "reminderFired": false
            }
        ])
    );
}

#[test]
fn corrupt_or_foreign_payloads_load_as_empty() {
    for payload in ["not json", "null", "{\"id\": 1}", "[{\"text\": 3}]"] {
        let mut repo = MemoryKvRepository::new();
        repo.set_item(NOTES_KEY, payload).unwrap();
        let store = NoteStore::new(repo);
        assert!(store.list().is_empty(), "payload {payload} should load as empty");
    }
}

#[test]
fn legacy_payload_from_browser_storage_is_readable() {
    let mut repo = MemoryKvRepository::new();
    repo.set_item(
        NOTES_KEY,
        r#"[
            {"id": 1718000000000, "text": "water plants", "reminder": "2024-06-10T08:00", "reminderFired": true},
            {"id": 1717000000000, "text": "no reminder", "reminder": null, "reminderFired": false},
            {"id": 1716000000000, "text": "empty reminder", "reminder": ""}
        ]"#,
    )
    .unwrap();
    let store = NoteStore::new(repo);

    let listed = store.list();
    assert_eq!(listed.len(), 3);
    assert_eq!(
        listed[0].reminder.as_ref().map(Reminder::raw),
        Some("2024-06-10T08:00")
    );
    assert!(listed[0].reminder_fired);
    assert!(listed[1].reminder.is_none());
    assert!(listed[2].reminder.is_none());
    assert!(!listed[2].reminder_fired);
}

#[test]
fn notes_survive_reopening_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remindnote.sqlite3");

    let created = {
        let conn = open_db(&path).unwrap();
        let mut store = NoteStore::new(SqliteKvRepository::try_new(&conn).unwrap());
        store.create("persist me", None).unwrap()
    };

    let conn = open_db(&path).unwrap();
    let store = NoteStore::new(SqliteKvRepository::try_new(&conn).unwrap());
    assert_eq!(store.list(), vec![created]);
}

#[test]
fn write_failures_surface_as_repo_errors() {
    let mut store = NoteStore::new(FailingKvRepository::seeded(TWO_NOTES, false, true));

    let err = store.create("new", None).unwrap_err();
    assert!(matches!(err, StoreError::Repo(RepoError::MissingRequiredTable(_))));

    let err = store.delete(1).unwrap_err();
    assert!(matches!(err, StoreError::Repo(_)));

    let err = store.mark_fired(2).unwrap_err();
    assert!(matches!(err, StoreError::Repo(_)));

    let listed = store.list();
    assert_eq!(listed.len(), 2);
    assert!(!listed[0].reminder_fired);
}

#[test]
fn write_failures_are_not_reported_for_noops() {
    let mut store = NoteStore::new(FailingKvRepository::seeded(TWO_NOTES, false, true));
    store.delete(404).unwrap();
    assert!(!store.mark_fired(404).unwrap());
}

#[test]
fn read_failure_lists_as_empty() {
    let store = NoteStore::new(FailingKvRepository::seeded(TWO_NOTES, true, false));
    assert!(store.list().is_empty());
    assert!(store.get(1).is_none());
}

#[test]
fn malformed_entries_are_skipped_and_the_rest_survive_a_write() {
    let mut repo = MemoryKvRepository::new();
    repo.set_item(
        NOTES_KEY,
        r#"[
            {"id": 3, "text": "good"},
            {"id": "three", "text": "bad id"},
            {"id": 1.7e12, "text": "float id", "reminder": null, "reminderFired": false},
            {"id": 2.5, "text": "fractional id"},
            {"text": "missing id"}
        ]"#,
    )
    .unwrap();
    let mut store = NoteStore::new(repo);

    let ids: Vec<i64> = store.list().into_iter().map(|note| note.id).collect();
    assert_eq!(ids, vec![3, 1_700_000_000_000]);

    store.create("fresh", None).unwrap();
    let texts: Vec<String> = store.list().into_iter().map(|note| note.text).collect();
    assert_eq!(texts, vec!["fresh", "good", "float id"]);
}
