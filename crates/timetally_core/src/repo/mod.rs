//! Persistence gateways over the SQLite store.
//!
//! # Responsibility
//! - Translate node and work records to and from store rows.
//! - Keep SQL text and column binding inside the repository boundary.
//!
//! # Invariants
//! - Repositories are constructed only over a fully migrated connection.
//! - Failures are returned, never swallowed; callers decide what to log.

pub mod node_repo;
pub mod work_repo;
