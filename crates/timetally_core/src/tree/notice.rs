//! Row-precise change notices for presentation layers.

use crate::tree::store::NodeAddress;

/// Structural or data change applied to the tree.
///
/// `parent: None` addresses the synthetic root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeNotice {
    /// Rows `first..=last` were appended under `parent`.
    RowsInserted {
        parent: Option<NodeAddress>,
        first: usize,
        last: usize,
    },
    /// Attributes of the node at `index` changed; row layout is untouched.
    DataChanged { index: NodeAddress },
    /// All realized nodes were dropped; every outstanding address is stale.
    Reset,
}

impl ChangeNotice {
    /// Whether the notice alters the set or order of rows.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::DataChanged { .. })
    }
}
