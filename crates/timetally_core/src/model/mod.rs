//! Domain model for the customer/project/task hierarchy.
//!
//! # Responsibility
//! - Define the node record shared by the tree, the store gateway and the summary.
//! - Keep kind-specific behaviour in one closed table.
//!
//! # Invariants
//! - A node's kind never changes after construction.
//! - A node has a persisted identity iff it was written to the store.

pub mod node;
pub mod work;
