//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted note shape (`id`, `text`, `reminder`,
//!   `reminderFired`).
//! - Normalize user text and reminder input at creation time.
//!
//! # Invariants
//! - `text` is trimmed and never empty for a created note.
//! - A reminder without a parseable instant is kept verbatim but never due.
//! - `reminder_fired` is ignored when `reminder` is absent.

use chrono::{DateTime, Duration, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for one note.
///
/// Epoch milliseconds of creation, bumped when needed to stay unique.
pub type NoteId = i64;

/// Largest integer a JSON number (IEEE-754 double) holds exactly.
const MAX_SAFE_JSON_INTEGER: f64 = 9_007_199_254_740_992.0;

const NAIVE_REMINDER_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Validation errors raised while building a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Text is empty after trimming.
    EmptyText,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "note text cannot be empty"),
        }
    }
}

impl Error for NoteValidationError {}

/// Reminder timestamp attached to a note.
///
/// `raw` is the persisted string form. `at` is the resolved instant, or
/// `None` when `raw` could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    raw: String,
    at: Option<DateTime<Utc>>,
}

impl Reminder {
    /// Builds a reminder firing at the given instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            raw: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            at: Some(instant),
        }
    }

    /// Builds a reminder from user input such as a `datetime-local` value.
    ///
    /// Returns `None` for blank input. Unparseable input is preserved as-is
    /// and yields a reminder that never becomes due.
    pub fn from_input(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            raw: trimmed.to_string(),
            at: parse_reminder_instant(trimmed),
        })
    }

    /// Persisted string form.
    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }

    /// Resolved instant, when the stored value parses.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.at
    }

    /// Returns whether the reminder time has been reached at `now`.
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.at.is_some_and(|at| now >= at)
    }
}

impl Serialize for Reminder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.raw.as_str())
    }
}

impl<'de> Deserialize<'de> for Reminder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self {
            at: parse_reminder_instant(raw.trim()),
            raw,
        })
    }
}

/// Canonical persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Integral JSON floats (`1.7e12`) are accepted on read.
    #[serde(deserialize_with = "deserialize_note_id")]
    pub id: NoteId,
    pub text: String,
    /// `null` on the wire when absent; an empty string is read as absent.
    #[serde(default, deserialize_with = "deserialize_optional_reminder")]
    pub reminder: Option<Reminder>,
    #[serde(default)]
    pub reminder_fired: bool,
}

impl Note {
    /// Creates an unfired note after trimming and validating `text`.
    pub fn new(
        id: NoteId,
        text: &str,
        reminder: Option<Reminder>,
    ) -> Result<Self, NoteValidationError> {
        let text = normalize_note_text(text)?;
        Ok(Self {
            id,
            text,
            reminder,
            reminder_fired: false,
        })
    }

    /// Returns whether this note's reminder should fire at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.reminder_fired
            && self
                .reminder
                .as_ref()
                .is_some_and(|reminder| reminder.has_elapsed(now))
    }

    /// Flags the reminder as fired. Returns `false` when nothing changed.
    pub fn mark_fired(&mut self) -> bool {
        if self.reminder_fired {
            return false;
        }
        self.reminder_fired = true;
        true
    }
}

/// Trims note text and rejects blank values.
pub fn normalize_note_text(text: &str) -> Result<String, NoteValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NoteValidationError::EmptyText);
    }
    Ok(trimmed.to_string())
}

fn parse_reminder_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_REMINDER_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(raw, format).ok()?;
        resolve_local_wall_time(naive)
    })
}

/// Maps a local wall time to an instant.
///
/// Repeated wall times resolve to the earlier instant. Wall times skipped by
/// a forward DST jump move forward by the gap, so `02:30` on a spring-forward
/// night fires at `03:30`.
fn resolve_local_wall_time(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
}

fn deserialize_optional_reminder<'de, D>(deserializer: D) -> Result<Option<Reminder>, D::Error>
where
    D: Deserializer<'de>,
{
    let reminder = Option::<Reminder>::deserialize(deserializer)?;
    Ok(reminder.filter(|value| !value.raw.trim().is_empty()))
}

fn deserialize_note_id<'de, D>(deserializer: D) -> Result<NoteId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireId {
        Integer(i64),
        Float(f64),
    }

    match WireId::deserialize(deserializer)? {
        WireId::Integer(id) => Ok(id),
        WireId::Float(id) if id.fract() == 0.0 && id.abs() < MAX_SAFE_JSON_INTEGER => Ok(id as i64),
        WireId::Float(id) => Err(serde::de::Error::custom(format!(
            "note id `{id}` is not an integer"
        ))),
    }
}
