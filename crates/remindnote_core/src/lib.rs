//! Core domain logic for RemindNote.
//! This crate is the single source of truth for note and reminder invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::note::{Note, NoteId, NoteValidationError, Reminder};
pub use reminder::notifier::{
    AlertChannel, AlertError, AlertMessage, BlockingAlert, ChannelNotifier, Delivery, Notifier,
    Permission, PermissionFuture,
};
pub use reminder::scheduler::{ReminderScheduler, TickReport, DEFAULT_CHECK_INTERVAL};
pub use repo::kv_repo::{KvRepository, MemoryKvRepository, RepoError, RepoResult, SqliteKvRepository};
pub use service::note_store::{NoteStore, StoreError, StoreResult, NOTES_KEY};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
