//! Domain model for reminder notes.
//!
//! # Responsibility
//! - Define the canonical note record persisted by the store.
//! - Own reminder parsing and the "due" predicate used by the scheduler.
//!
//! # Invariants
//! - Every stored note is identified by a unique `NoteId`.
//! - `reminder_fired` only ever moves from `false` to `true`.

pub mod note;
