//! Layout steps for the note key-value store.
//!
//! # Responsibility
//! - List the SQL steps that build `kv_store` from an empty file.
//! - Run the steps a file has not seen yet, inside one transaction.
//!
//! # Invariants
//! - Step versions start at 1 and increase by one.
//! - A file either ends at `latest_version()` or keeps its previous layout.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

/// One layout change, identified by the `user_version` it produces.
#[derive(Debug, Clone, Copy)]
struct LayoutStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const LAYOUT_STEPS: &[LayoutStep] = &[LayoutStep {
    version: 1,
    name: "kv_store",
    sql: include_str!("0001_init.sql"),
}];

/// Returns the newest layout version this build can write.
pub fn latest_version() -> u32 {
    LAYOUT_STEPS.last().map_or(0, |step| step.version)
}

/// Reads the layout version recorded in the file.
pub fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings `kv_store` up to [`latest_version`].
///
/// Returns [`DbError::SchemaTooNew`] without touching the file when it was
/// written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = stored_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }
    if found == supported {
        debug!("event=db_migrate module=db status=skipped version={found}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in LAYOUT_STEPS.iter().filter(|step| step.version > found) {
        run_step(&tx, step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        found, supported
    );
    Ok(())
}

fn run_step(tx: &Transaction<'_>, step: &LayoutStep) -> DbResult<()> {
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} step={}",
        step.version, step.name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, stored_version, LAYOUT_STEPS};
    use rusqlite::Connection;

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (index, step) in LAYOUT_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }

    #[test]
    fn fresh_connection_reaches_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 0);
        apply_migrations(&mut conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), latest_version());
        apply_migrations(&mut conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), latest_version());
    }
}
