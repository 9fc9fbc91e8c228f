//! Node persistence gateway and SQLite implementation.
//!
//! # Responsibility
//! - Decide insert versus update for a flushed node and hand back its identity.
//! - List the stored children of one parent in display order.
//!
//! # Invariants
//! - Child listing is ordered by `name ASC, id ASC`.
//! - Children of the synthetic root are stored with `parent IS NULL`.
//! - Exactly name, type, descr, active, charge and parent are bound on flush.

use crate::db::{latest_version, schema_version, DbError};
use crate::model::node::{NodeId, NodeRecord, StoredNode};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NODE_SELECT_SQL: &str = "SELECT id, name, type, descr, active, charge, parent FROM node";

const NODE_COLUMNS: [&str; 7] = ["id", "name", "type", "descr", "active", "charge", "parent"];

/// Result type used by repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from node and work repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Update targeted a node id with no stored row.
    NodeNotFound(NodeId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// The synthetic root was handed to the gateway.
    RootNotPersistable,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NodeNotFound(id) => write!(f, "node not found: #{id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "node repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "node repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "node repository requires column `{column}` in table `{table}`"
            ),
            Self::RootNotPersistable => write!(f, "the tree root is never stored"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Gateway between in-memory nodes and stored rows.
pub trait NodeRepository {
    /// Lists stored children of `parent_id` (`None` = root level), ordered by name.
    fn list_children(&self, parent_id: Option<NodeId>) -> RepoResult<Vec<StoredNode>>;
    /// Inserts the record when it has no id, updates it otherwise.
    ///
    /// Returns the record's identity (freshly generated on insert).
    fn flush(&self, record: &NodeRecord) -> RepoResult<NodeId>;
    /// Loads one stored row by id.
    fn get_node(&self, id: NodeId) -> RepoResult<Option<StoredNode>>;
}

impl<R: NodeRepository + ?Sized> NodeRepository for &R {
    fn list_children(&self, parent_id: Option<NodeId>) -> RepoResult<Vec<StoredNode>> {
        (**self).list_children(parent_id)
    }

    fn flush(&self, record: &NodeRecord) -> RepoResult<NodeId> {
        (**self).flush(record)
    }

    fn get_node(&self, id: NodeId) -> RepoResult<Option<StoredNode>> {
        (**self).get_node(id)
    }
}

/// SQLite-backed node repository.
pub struct SqliteNodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "node", &NODE_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl NodeRepository for SqliteNodeRepository<'_> {
    fn list_children(&self, parent_id: Option<NodeId>) -> RepoResult<Vec<StoredNode>> {
        let mut items = Vec::new();
        match parent_id {
            Some(parent_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{NODE_SELECT_SQL} WHERE parent = ?1 ORDER BY name ASC, id ASC;"
                ))?;
                let mut rows = stmt.query([parent_id])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_node_row(row)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{NODE_SELECT_SQL} WHERE parent IS NULL ORDER BY name ASC, id ASC;"
                ))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    items.push(parse_node_row(row)?);
                }
            }
        }
        Ok(items)
    }

    fn flush(&self, record: &NodeRecord) -> RepoResult<NodeId> {
        if !record.kind.is_persistable() {
            return Err(RepoError::RootNotPersistable);
        }

        let id = match record.id {
            Some(id) => {
                let changed = self.conn.execute(
                    "UPDATE node
                     SET name = ?2, type = ?3, descr = ?4, active = ?5, charge = ?6, parent = ?7
                     WHERE id = ?1;",
                    params![
                        id,
                        record.name,
                        record.kind.type_code(),
                        record.descr,
                        record.active,
                        record.charge,
                        record.parent_id,
                    ],
                )?;
                if changed == 0 {
                    return Err(RepoError::NodeNotFound(id));
                }
                id
            }
            None => {
                self.conn.execute(
                    "INSERT INTO node (name, type, descr, active, charge, parent)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    params![
                        record.name,
                        record.kind.type_code(),
                        record.descr,
                        record.active,
                        record.charge,
                        record.parent_id,
                    ],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        debug!(
            "event=node_flush module=repo status=ok op={} node_id={} parent_id={}",
            if record.id.is_some() { "update" } else { "insert" },
            id,
            record
                .parent_id
                .map_or_else(|| "null".to_string(), |value| value.to_string())
        );
        Ok(id)
    }

    fn get_node(&self, id: NodeId) -> RepoResult<Option<StoredNode>> {
        let node = self
            .conn
            .query_row(&format!("{NODE_SELECT_SQL} WHERE id = ?1;"), [id], |row| {
                Ok(parse_node_row(row))
            })
            .optional()?
            .transpose()?;
        Ok(node)
    }
}

fn parse_node_row(row: &Row<'_>) -> RepoResult<StoredNode> {
    Ok(StoredNode {
        id: row.get("id")?,
        name: row.get("name")?,
        type_code: row.get("type")?,
        descr: row.get::<_, Option<String>>("descr")?.unwrap_or_default(),
        active: row.get("active")?,
        charge: row.get("charge")?,
        parent: row.get("parent")?,
    })
}

/// Verifies schema version and required columns before a repository is used.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
