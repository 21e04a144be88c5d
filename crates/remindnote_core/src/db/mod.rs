//! Persistence backend for the note key-value store.
//!
//! # Responsibility
//! - Own the single SQLite file (or in-memory database) holding `kv_store`,
//!   the table where the notes array lives under its fixed key.
//! - Bring that table to the current layout before any repository sees it.
//!
//! # Invariants
//! - The layout version is `PRAGMA user_version`; a file written by a newer
//!   build is refused rather than downgraded.
//! - `KvRepository` implementations only receive migrated connections.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// Table holding one JSON document per key.
pub const KV_STORE_TABLE: &str = "kv_store";

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or migrate the note store file.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "note store layout v{found} was written by a newer build; this build reads up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
