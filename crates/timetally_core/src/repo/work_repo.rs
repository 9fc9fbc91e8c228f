//! Work log repository.
//!
//! # Invariants
//! - Work rows reference an existing node (enforced by `foreign_keys=ON`).
//! - Span queries are inclusive on both ends and grouped by `(node, day)`.

use crate::model::node::NodeId;
use crate::model::work::{DailyCharge, WorkEntry, WorkId};
use crate::repo::node_repo::{ensure_connection_ready, RepoResult};
use chrono::NaiveDate;
use log::debug;
use rusqlite::{params, Connection};

const WORK_COLUMNS: [&str; 4] = ["id", "node", "day", "charge"];

/// Repository interface for dated charges.
pub trait WorkRepository {
    /// Appends one work entry.
    fn log_work(&self, entry: &WorkEntry) -> RepoResult<WorkId>;
    /// Sums charges per `(node, day)` for days in `first..=last`.
    fn daily_charges(&self, first: NaiveDate, last: NaiveDate) -> RepoResult<Vec<DailyCharge>>;
}

/// SQLite-backed work repository.
pub struct SqliteWorkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "work", &WORK_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl WorkRepository for SqliteWorkRepository<'_> {
    fn log_work(&self, entry: &WorkEntry) -> RepoResult<WorkId> {
        self.conn.execute(
            "INSERT INTO work (node, day, charge) VALUES (?1, ?2, ?3);",
            params![entry.node, entry.day, entry.charge],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(
            "event=work_log module=repo status=ok work_id={id} node_id={} day={}",
            entry.node, entry.day
        );
        Ok(id)
    }

    fn daily_charges(&self, first: NaiveDate, last: NaiveDate) -> RepoResult<Vec<DailyCharge>> {
        let mut stmt = self.conn.prepare(
            "SELECT node, day, SUM(charge)
             FROM work
             WHERE day BETWEEN ?1 AND ?2
             GROUP BY node, day
             ORDER BY node ASC, day ASC;",
        )?;
        let mut rows = stmt.query(params![first, last])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(DailyCharge {
                node: row.get::<_, NodeId>(0)?,
                day: row.get(1)?,
                total: row.get(2)?,
            });
        }
        Ok(items)
    }
}
