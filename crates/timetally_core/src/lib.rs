//! Core of the timetally customer/project/task browser.
//!
//! The tree is materialized lazily from SQLite, addressed by `(parent, row)`
//! pairs and summarized per week from the work log.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod summary;
pub mod tree;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::node::{
    AttributeEdit, NewNode, Node, NodeAttributes, NodeId, NodeKind, NodeRecord, StoredNode,
};
pub use model::work::{DailyCharge, WorkEntry, WorkId};
pub use repo::node_repo::{NodeRepository, RepoError, RepoResult, SqliteNodeRepository};
pub use repo::work_repo::{SqliteWorkRepository, WorkRepository};
pub use summary::model::{Materialization, SummaryCell, SummaryModel, SummaryRow};
pub use summary::period::{parse_week_selector, Mode, WeekSpan, When};
pub use summary::{SummaryError, SummaryResult};
pub use tree::arena::NodeHandle;
pub use tree::notice::ChangeNotice;
pub use tree::store::{NodeAddress, TreeStore};
pub use tree::{TreeError, TreeResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
