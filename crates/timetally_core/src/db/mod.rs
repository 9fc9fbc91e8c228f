//! SQLite storage bootstrap for the node tree and work log.
//!
//! # Responsibility
//! - Open the single connection shared by the node and work repositories.
//! - Bring the `node` and `work` tables up to the schema this build expects.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Repositories must not touch `node`/`work` rows before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{latest_version, schema_version};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or upgrading the store.
#[derive(Debug)]
pub enum DbError {
    /// Connection setup or a plain query failed.
    Sqlite(rusqlite::Error),
    /// A schema step failed; the whole upgrade was rolled back.
    Migration {
        version: u32,
        table: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration {
                version,
                table,
                source,
            } => write!(f, "schema step {version} (`{table}` table) failed: {source}"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "time log schema version {found} is newer than this build supports ({supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
