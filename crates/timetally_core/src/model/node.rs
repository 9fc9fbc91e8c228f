//! Node record and kind behaviour table.
//!
//! # Invariants
//! - `NodeKind::Root` is synthetic: no type code in storage, no identity, no rename.
//! - `id.is_some()` iff the node has been flushed successfully at least once.
//! - `children` holds arena handles; ownership lives in the tree arena.

use crate::tree::arena::NodeHandle;
use serde::{Deserialize, Serialize};

/// Persisted identity of a node row.
pub type NodeId = i64;

/// Closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Synthetic tree root, never stored.
    Root,
    /// Grouping node.
    Folder,
    /// Customer record.
    Customer,
    /// Project under a customer.
    Project,
    /// Billable task; its work entries feed the weekly summary.
    Task,
}

impl NodeKind {
    /// Every kind that may appear as a stored row.
    pub const PERSISTABLE: [NodeKind; 4] = [
        NodeKind::Folder,
        NodeKind::Customer,
        NodeKind::Project,
        NodeKind::Task,
    ];

    /// Integer stored in `node.type`.
    pub fn type_code(self) -> i64 {
        match self {
            Self::Root => 0,
            Self::Folder => 1,
            Self::Customer => 2,
            Self::Project => 3,
            Self::Task => 4,
        }
    }

    /// Maps a stored type code back to a kind.
    ///
    /// Returns `None` for unknown codes and for the root code, which is never
    /// a valid stored row.
    pub fn from_type_code(code: i64) -> Option<Self> {
        Self::PERSISTABLE
            .into_iter()
            .find(|kind| kind.type_code() == code)
    }

    /// Icon resource key used by presentation layers.
    pub fn icon_key(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Folder => "folder",
            Self::Customer => "customer",
            Self::Project => "project",
            Self::Task => "task",
        }
    }

    /// Name given to freshly created nodes of this kind.
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Folder => "New Folder",
            Self::Customer => "New Customer",
            Self::Project => "New Project",
            Self::Task => "New Task",
        }
    }

    pub fn is_persistable(self) -> bool {
        !matches!(self, Self::Root)
    }
}

/// One stored `node` row as returned by the gateway.
///
/// `type_code` is kept raw so the tree can skip rows it does not understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNode {
    pub id: NodeId,
    pub name: String,
    pub type_code: i64,
    pub descr: String,
    pub active: bool,
    pub charge: i64,
    pub parent: Option<NodeId>,
}

/// Snapshot of the fields the gateway binds on flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// `None` selects insert, `Some` selects update.
    pub id: Option<NodeId>,
    pub name: String,
    pub kind: NodeKind,
    pub descr: String,
    pub active: bool,
    pub charge: i64,
    /// `None` for children of the synthetic root.
    pub parent_id: Option<NodeId>,
}

/// Consumer-facing attribute projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub id: Option<NodeId>,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub charge: i64,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub icon_key: String,
}

/// Initial attributes for `create_child`.
///
/// A `None` name falls back to the kind's default name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNode {
    pub name: Option<String>,
    pub descr: String,
    pub active: Option<bool>,
    pub charge: i64,
}

impl NewNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Partial attribute edit; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeEdit {
    pub descr: Option<String>,
    pub active: Option<bool>,
    pub charge: Option<i64>,
}

/// A single tree entry.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: Option<NodeId>,
    kind: NodeKind,
    pub name: String,
    pub descr: String,
    pub active: bool,
    pub charge: i64,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) is_fetched: bool,
    pub(crate) parent: Option<NodeHandle>,
}

impl Node {
    /// Synthetic root. Starts unfetched.
    pub fn root() -> Self {
        Self::blank(NodeKind::Root, String::new())
    }

    /// Fresh node awaiting its first flush, named after the kind default.
    pub fn pending(kind: NodeKind) -> Self {
        Self::blank(kind, kind.default_name().to_string())
    }

    /// Rebuilds a node from a stored row of a known kind.
    pub(crate) fn from_stored(kind: NodeKind, row: StoredNode) -> Self {
        Self {
            id: Some(row.id),
            name: row.name,
            descr: row.descr,
            active: row.active,
            charge: row.charge,
            ..Self::blank(kind, String::new())
        }
    }

    fn blank(kind: NodeKind, name: String) -> Self {
        Self {
            id: None,
            kind,
            name,
            descr: String::new(),
            active: true,
            charge: 0,
            children: Vec::new(),
            is_fetched: false,
            parent: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_fetched(&self) -> bool {
        self.is_fetched
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Handle of the child at `row`.
    pub fn get_child(&self, row: usize) -> Result<NodeHandle, OutOfRange> {
        self.children.get(row).copied().ok_or(OutOfRange {
            row,
            len: self.children.len(),
        })
    }

    /// Builds the flush snapshot for this node under `parent_id`.
    pub fn record(&self, parent_id: Option<NodeId>) -> NodeRecord {
        NodeRecord {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            descr: self.descr.clone(),
            active: self.active,
            charge: self.charge,
            parent_id,
        }
    }

    pub fn attributes(&self) -> NodeAttributes {
        NodeAttributes {
            id: self.id,
            name: self.name.clone(),
            description: self.descr.clone(),
            active: self.active,
            charge: self.charge,
            kind: self.kind,
            icon_key: self.kind.icon_key().to_string(),
        }
    }
}

/// Row index outside the realized children of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub row: usize,
    pub len: usize,
}
