//! Work log entries charged against task nodes.

use crate::model::node::NodeId;
use chrono::NaiveDate;

/// Persisted identity of a work row.
pub type WorkId = i64;

/// One charge logged against a task on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkEntry {
    pub node: NodeId,
    pub day: NaiveDate,
    pub charge: i64,
}

impl WorkEntry {
    pub fn new(node: NodeId, day: NaiveDate, charge: i64) -> Self {
        Self { node, day, charge }
    }
}

/// Sum of all charges for one node on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCharge {
    pub node: NodeId,
    pub day: NaiveDate,
    pub total: i64,
}
