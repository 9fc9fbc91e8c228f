//! Ordered schema steps for the time log.
//!
//! Step 1 creates the `node` tree table, step 2 the per-day `work` log.
//! Pending steps run in one transaction and the reached step is mirrored to
//! `PRAGMA user_version`, so a failed step leaves the file at its old version.

use crate::db::{DbError, DbResult};
use log::{debug, error, info};
use rusqlite::{Connection, Transaction};

struct SchemaStep {
    version: u32,
    table: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: [SchemaStep; 2] = [
    SchemaStep {
        version: 1,
        table: "node",
        sql: include_str!("0001_node.sql"),
    },
    SchemaStep {
        version: 2,
        table: "work",
        sql: include_str!("0002_work.sql"),
    },
];

/// Highest schema version this build can create.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Version currently recorded in the database file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Runs every step above the recorded version.
///
/// Returns the number of steps applied.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::UnsupportedSchemaVersion { found, supported });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        run_step(&tx, step).map_err(|source| {
            error!(
                "event=db_migrate module=db status=error version={} table={} error={source}",
                step.version, step.table
            );
            DbError::Migration {
                version: step.version,
                table: step.table,
                source,
            }
        })?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} table={}",
            step.version, step.table
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={found} to_version={supported} steps={}",
        pending.len()
    );
    Ok(pending.len())
}

fn run_step(tx: &Transaction<'_>, step: &SchemaStep) -> rusqlite::Result<()> {
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)
}
