//! Weekly charge summary over the realized node tree.
//!
//! # Responsibility
//! - Resolve the selected period to a Monday..Sunday span.
//! - Sum work-log charges per realized task and per day.
//! - Expose the result as a read-only table.
//!
//! # Invariants
//! - In `Materialization::RealizedOnly` mode the summary never triggers fetches.
//! - Tasks that are not realized contribute nothing.

pub mod model;
pub mod period;

use crate::model::node::NodeId;
use crate::repo::node_repo::RepoError;
use crate::tree::TreeError;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SummaryResult<T> = Result<T, SummaryError>;

/// Errors from summary computation and period selection.
#[derive(Debug)]
pub enum SummaryError {
    /// Full materialization of the tree failed.
    Tree(TreeError),
    /// Work log query failed.
    Repo(RepoError),
    /// Week selector text or week number is not a valid ISO week.
    InvalidWeek(String),
    /// A task's charges for one day exceed the `i64` range.
    ChargeOverflow { node: NodeId, day: NaiveDate },
}

impl Display for SummaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InvalidWeek(value) => write!(f, "invalid week selector: `{value}`"),
            Self::ChargeOverflow { node, day } => {
                write!(f, "charges of node #{node} on {day} overflow")
            }
        }
    }
}

impl Error for SummaryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::InvalidWeek(_) | Self::ChargeOverflow { .. } => None,
        }
    }
}

impl From<TreeError> for SummaryError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

impl From<RepoError> for SummaryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
