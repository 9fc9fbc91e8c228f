//! In-memory node tree with lazy child materialization.
//!
//! # Responsibility
//! - Own every realized node in a generation-checked arena.
//! - Resolve consumer `(parent, row)` addresses to nodes.
//! - Route mutations through the persistence gateway before touching memory.
//!
//! # Invariants
//! - A node's children are fetched from the store at most once per realization.
//! - Memory never references a node whose flush failed.
//! - Every successful mutation queues a row-precise change notice.

pub mod arena;
pub mod notice;
pub mod store;

use crate::model::node::{NodeId, OutOfRange};
use crate::repo::node_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors from tree store operations.
#[derive(Debug)]
pub enum TreeError {
    /// Gateway query failed; the attempted operation had no in-memory effect.
    Storage(RepoError),
    /// Row index outside the realized children of the addressed node.
    OutOfRange { row: usize, len: usize },
    /// Name is blank after trim.
    InvalidName,
    /// The synthetic root cannot be renamed or edited.
    RootNotEditable,
    /// Address refers to a node dropped by a reload.
    StaleAddress,
    /// Stored row carries a type code outside the known kinds.
    UnknownRowType { id: NodeId, code: i64 },
    /// Only pending nodes can be added; stored rows are never re-parented.
    AlreadyPersisted { id: NodeId },
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "storage error: {err}"),
            Self::OutOfRange { row, len } => {
                write!(f, "row {row} out of range for {len} children")
            }
            Self::InvalidName => write!(f, "node name must not be blank"),
            Self::RootNotEditable => write!(f, "the tree root cannot be edited"),
            Self::StaleAddress => write!(f, "address refers to a node that is no longer loaded"),
            Self::UnknownRowType { id, code } => {
                write!(f, "node #{id} has unknown type code {code}")
            }
            Self::AlreadyPersisted { id } => {
                write!(f, "node #{id} is already stored and cannot be added again")
            }
        }
    }
}

impl Error for TreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TreeError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<OutOfRange> for TreeError {
    fn from(value: OutOfRange) -> Self {
        Self::OutOfRange {
            row: value.row,
            len: value.len,
        }
    }
}
