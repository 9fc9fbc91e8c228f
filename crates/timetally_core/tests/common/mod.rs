#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::cell::Cell;
use timetally_core::db::{open_db_in_memory, DbError};
use timetally_core::{NodeId, NodeRecord, NodeRepository, RepoError, RepoResult, StoredNode};

pub const FOLDER: i64 = 1;
pub const CUSTOMER: i64 = 2;
pub const PROJECT: i64 = 3;
pub const TASK: i64 = 4;

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Inserts a raw `node` row, bypassing the gateway.
pub fn insert_row(
    conn: &Connection,
    id: NodeId,
    name: &str,
    type_code: i64,
    parent: Option<NodeId>,
) {
    conn.execute(
        "INSERT INTO node (id, name, type, descr, active, charge, parent)
         VALUES (?1, ?2, ?3, '', 1, 0, ?4);",
        params![id, name, type_code, parent],
    )
    .unwrap();
}

pub fn node_row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM node;", [], |row| row.get(0)).unwrap()
}

/// Makes the store reject any insert or update that sets `name`.
pub fn reject_name(conn: &Connection, name: &str) {
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_insert BEFORE INSERT ON node WHEN NEW.name = '{name}'
         BEGIN SELECT RAISE(ABORT, 'name rejected'); END;
         CREATE TRIGGER reject_update BEFORE UPDATE ON node WHEN NEW.name = '{name}'
         BEGIN SELECT RAISE(ABORT, 'name rejected'); END;"
    ))
    .unwrap();
}

/// Gateway wrapper that counts calls and fails on demand.
pub struct CountingRepo<R> {
    inner: R,
    pub list_calls: Cell<usize>,
    pub flush_calls: Cell<usize>,
    pub fail_list: Cell<bool>,
    pub fail_flush: Cell<bool>,
}

impl<R: NodeRepository> CountingRepo<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            list_calls: Cell::new(0),
            flush_calls: Cell::new(0),
            fail_list: Cell::new(false),
            fail_flush: Cell::new(false),
        }
    }
}

fn injected_failure() -> RepoError {
    RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
        Some("injected failure".to_string()),
    )))
}

impl<R: NodeRepository> NodeRepository for CountingRepo<R> {
    fn list_children(&self, parent_id: Option<NodeId>) -> RepoResult<Vec<StoredNode>> {
        self.list_calls.set(self.list_calls.get() + 1);
        if self.fail_list.get() {
            return Err(injected_failure());
        }
        self.inner.list_children(parent_id)
    }

    fn flush(&self, record: &NodeRecord) -> RepoResult<NodeId> {
        self.flush_calls.set(self.flush_calls.get() + 1);
        if self.fail_flush.get() {
            return Err(injected_failure());
        }
        self.inner.flush(record)
    }

    fn get_node(&self, id: NodeId) -> RepoResult<Option<StoredNode>> {
        self.inner.get_node(id)
    }
}
