//! Lazy-loading tree store.
//!
//! # Responsibility
//! - Translate `(parent, row)` addresses into realized nodes.
//! - Fetch children from the gateway on first access, exactly once.
//! - Apply add/rename/edit as "flush first, then mutate memory on success".
//!
//! # Invariants
//! - Children are name-ordered at fetch time; later additions are appended.
//! - A new node's row equals the parent's child count before the add.
//! - Failed fetches leave the node unfetched so the next access retries.

use crate::logging::sanitize_message;
use crate::model::node::{AttributeEdit, NewNode, Node, NodeAttributes, NodeId, NodeKind};
use crate::repo::node_repo::NodeRepository;
use crate::tree::arena::{NodeArena, NodeHandle};
use crate::tree::notice::ChangeNotice;
use crate::tree::{TreeError, TreeResult};
use log::{debug, info, warn};

const MAX_LOGGED_NAME_CHARS: usize = 64;

/// Consumer-held reference to a realized, non-root node.
///
/// The row is fixed at creation; rows only grow by appending, so it stays
/// valid until the next reload, after which the handle no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    row: usize,
    handle: NodeHandle,
}

impl NodeAddress {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }
}

/// Node tree backed by a persistence gateway.
pub struct TreeStore<R: NodeRepository> {
    repo: R,
    arena: NodeArena,
    root: NodeHandle,
    notices: Vec<ChangeNotice>,
}

impl<R: NodeRepository> TreeStore<R> {
    /// Creates the tree and realizes the root's direct children.
    ///
    /// A failing initial fetch is logged; the root stays unfetched and is
    /// retried on the next access.
    pub fn new(repo: R) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(Node::root());
        let mut store = Self {
            repo,
            arena,
            root,
            notices: Vec::new(),
        };
        store.ensure_fetched(root);
        store
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn root_handle(&self) -> NodeHandle {
        self.root
    }

    /// Looks up a realized node by handle without triggering a fetch.
    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.arena.get(handle)
    }

    /// Looks up the node behind an address without triggering a fetch.
    pub fn node(&self, address: NodeAddress) -> Option<&Node> {
        self.arena.get(address.handle)
    }

    /// Number of realized nodes, root included.
    pub fn realized_len(&self) -> usize {
        self.arena.len()
    }

    /// Number of children under `parent` (`None` = root), fetching on first use.
    ///
    /// Stale addresses and failed fetches report zero children.
    pub fn child_count(&mut self, parent: Option<NodeAddress>) -> usize {
        let Ok(handle) = self.resolve(parent) else {
            warn!("event=child_count module=tree status=error error=stale_address");
            return 0;
        };
        self.ensure_fetched(handle);
        self.arena.get(handle).map_or(0, Node::child_count)
    }

    pub fn has_children(&mut self, parent: Option<NodeAddress>) -> bool {
        self.child_count(parent) > 0
    }

    /// Address of the child at `row` under `parent`, or the reason it has none.
    pub fn try_child(
        &mut self,
        parent: Option<NodeAddress>,
        row: usize,
    ) -> TreeResult<NodeAddress> {
        let handle = self.resolve(parent)?;
        self.ensure_fetched(handle);
        let child = self
            .arena
            .get(handle)
            .ok_or(TreeError::StaleAddress)?
            .get_child(row)?;
        Ok(NodeAddress { row, handle: child })
    }

    /// Address of the child at `row` under `parent`.
    ///
    /// Invalid rows are logged and yield `None`.
    pub fn child(&mut self, parent: Option<NodeAddress>, row: usize) -> Option<NodeAddress> {
        match self.try_child(parent, row) {
            Ok(address) => Some(address),
            Err(err) => {
                warn!(
                    "event=child_lookup module=tree status=error row={row} parent_id={} error={err}",
                    self.describe(parent)
                );
                None
            }
        }
    }

    /// Address of the parent of `address`, or `None` when the parent is the root.
    pub fn parent_of(&self, address: NodeAddress) -> Option<NodeAddress> {
        let parent = self.arena.get(address.handle)?.parent()?;
        self.address_of(parent)
    }

    /// Address of a realized node; `None` for the root and for stale handles.
    pub fn address_of(&self, handle: NodeHandle) -> Option<NodeAddress> {
        if handle == self.root {
            return None;
        }
        let row = self.arena.row_of(handle)?;
        Some(NodeAddress { row, handle })
    }

    /// Finds a realized node by persisted id without fetching.
    pub fn locate(&self, id: NodeId) -> Option<NodeAddress> {
        let mut pending = vec![self.root];
        while let Some(handle) = pending.pop() {
            let Some(node) = self.arena.get(handle) else {
                continue;
            };
            if node.id == Some(id) {
                return self.address_of(handle);
            }
            pending.extend_from_slice(node.children());
        }
        None
    }

    /// Realizes only the ancestor chain of stored node `id` and returns its address.
    ///
    /// `None` when the row is missing or its chain does not reach the root.
    pub fn reveal(&mut self, id: NodeId) -> TreeResult<Option<NodeAddress>> {
        if let Some(address) = self.locate(id) {
            return Ok(Some(address));
        }

        let mut path = Vec::new();
        let mut next = Some(id);
        while let Some(current) = next {
            if path.contains(&current) {
                warn!("event=node_reveal module=tree status=error node_id={id} cycle_at={current}");
                return Ok(None);
            }
            let Some(row) = self.repo.get_node(current)? else {
                return Ok(None);
            };
            path.push(current);
            next = row.parent;
        }

        let mut parent = self.root;
        let mut address = None;
        for ancestor in path.into_iter().rev() {
            self.fetch_children(parent)?;
            let Some(found) = self.child_with_id(parent, ancestor) else {
                return Ok(None);
            };
            parent = found.handle;
            address = Some(found);
        }
        Ok(address)
    }

    pub fn attributes(&self, address: NodeAddress) -> Option<NodeAttributes> {
        self.arena.get(address.handle).map(Node::attributes)
    }

    /// Persists `node` and appends it under `parent`.
    ///
    /// `node` must be pending. The parent is realized before the flush so the
    /// new row is not fetched a second time. On any failure the tree is left
    /// untouched.
    pub fn add_node(
        &mut self,
        parent: Option<NodeAddress>,
        mut node: Node,
    ) -> TreeResult<NodeAddress> {
        if let Some(id) = node.id {
            return Err(TreeError::AlreadyPersisted { id });
        }
        let parent_handle = self.resolve(parent)?;
        if node.name.trim().is_empty() {
            return Err(TreeError::InvalidName);
        }
        self.fetch_children(parent_handle)?;

        let parent_id = self.persisted_id(parent_handle);
        let record = node.record(parent_id);
        let id = match self.repo.flush(&record) {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    "event=node_add module=tree status=error name={} parent_id={} error={err}",
                    sanitize_message(&node.name, MAX_LOGGED_NAME_CHARS),
                    format_id(parent_id)
                );
                return Err(err.into());
            }
        };
        node.id = Some(id);

        let row = self.arena.get(parent_handle).map_or(0, Node::child_count);
        let name = sanitize_message(&node.name, MAX_LOGGED_NAME_CHARS);
        let handle = self
            .arena
            .add_child(parent_handle, node)
            .ok_or(TreeError::StaleAddress)?;
        self.notices.push(ChangeNotice::RowsInserted {
            parent,
            first: row,
            last: row,
        });
        info!(
            "event=node_add module=tree status=ok node_id={id} name={name} parent_id={} row={row}",
            format_id(parent_id)
        );
        Ok(NodeAddress { row, handle })
    }

    /// Creates a node of `kind` under `parent` from initial attributes.
    pub fn create_child(
        &mut self,
        parent: Option<NodeAddress>,
        kind: NodeKind,
        init: NewNode,
    ) -> TreeResult<NodeAddress> {
        if !kind.is_persistable() {
            return Err(TreeError::RootNotEditable);
        }
        let mut node = Node::pending(kind);
        if let Some(name) = init.name {
            node.name = normalize_name(&name)?;
        }
        node.descr = init.descr;
        node.charge = init.charge;
        if let Some(active) = init.active {
            node.active = active;
        }
        self.add_node(parent, node)
    }

    /// Renames the node at `address`.
    ///
    /// Blank names and the root are rejected before any store call. The
    /// in-memory name changes only after the store accepted it.
    pub fn rename(&mut self, address: NodeAddress, new_name: &str) -> TreeResult<()> {
        let name = normalize_name(new_name)?;
        self.apply_edit(address, |node| node.name = name)
    }

    /// Changes description, active flag or charge with the same contract as `rename`.
    pub fn update_attributes(
        &mut self,
        address: NodeAddress,
        edit: AttributeEdit,
    ) -> TreeResult<()> {
        self.apply_edit(address, move |node| {
            if let Some(descr) = edit.descr {
                node.descr = descr;
            }
            if let Some(active) = edit.active {
                node.active = active;
            }
            if let Some(charge) = edit.charge {
                node.charge = charge;
            }
        })
    }

    /// Drops every realized node and refetches the root's children.
    pub fn reload(&mut self) {
        let released = self.arena.clear_children(self.root);
        self.notices.push(ChangeNotice::Reset);
        info!("event=tree_reload module=tree status=start released={released}");
        self.ensure_fetched(self.root);
    }

    /// Fetches every unfetched node reachable from the root.
    ///
    /// Returns the number of nodes realized afterwards, root included.
    pub fn realize_all(&mut self) -> TreeResult<usize> {
        let mut pending = vec![self.root];
        while let Some(handle) = pending.pop() {
            self.fetch_children(handle)?;
            if let Some(node) = self.arena.get(handle) {
                pending.extend_from_slice(node.children());
            }
        }
        debug!(
            "event=tree_realize_all module=tree status=ok nodes={}",
            self.arena.len()
        );
        Ok(self.arena.len())
    }

    /// Returns and clears queued change notices in emission order.
    pub fn drain_notices(&mut self) -> Vec<ChangeNotice> {
        std::mem::take(&mut self.notices)
    }

    fn apply_edit(
        &mut self,
        address: NodeAddress,
        edit: impl FnOnce(&mut Node),
    ) -> TreeResult<()> {
        let current = self
            .arena
            .get(address.handle)
            .ok_or(TreeError::StaleAddress)?;
        if current.kind() == NodeKind::Root {
            return Err(TreeError::RootNotEditable);
        }

        let mut staged = current.clone();
        edit(&mut staged);
        let parent_id = current.parent().and_then(|parent| self.persisted_id(parent));
        if let Err(err) = self.repo.flush(&staged.record(parent_id)) {
            warn!(
                "event=node_update module=tree status=error node_id={} name={} error={err}",
                format_id(staged.id),
                sanitize_message(&staged.name, MAX_LOGGED_NAME_CHARS)
            );
            return Err(err.into());
        }

        let node = self
            .arena
            .get_mut(address.handle)
            .ok_or(TreeError::StaleAddress)?;
        node.name = staged.name;
        node.descr = staged.descr;
        node.active = staged.active;
        node.charge = staged.charge;
        self.notices.push(ChangeNotice::DataChanged { index: address });
        debug!(
            "event=node_update module=tree status=ok node_id={}",
            format_id(node.id)
        );
        Ok(())
    }

    fn resolve(&self, address: Option<NodeAddress>) -> TreeResult<NodeHandle> {
        match address {
            None => Ok(self.root),
            Some(address) if self.arena.contains(address.handle) => Ok(address.handle),
            Some(_) => Err(TreeError::StaleAddress),
        }
    }

    fn ensure_fetched(&mut self, handle: NodeHandle) {
        if let Err(err) = self.fetch_children(handle) {
            warn!("event=node_fetch module=tree status=error error={err}");
        }
    }

    fn fetch_children(&mut self, handle: NodeHandle) -> TreeResult<()> {
        let node = self.arena.get(handle).ok_or(TreeError::StaleAddress)?;
        if node.is_fetched() {
            return Ok(());
        }
        let parent_id = node.id;
        if parent_id.is_none() && handle != self.root {
            // Pending nodes have nothing stored beneath them yet.
            self.mark_fetched(handle);
            return Ok(());
        }

        let rows = self.repo.list_children(parent_id)?;
        let total = rows.len();
        let mut skipped = 0;
        for row in rows {
            let Some(kind) = NodeKind::from_type_code(row.type_code) else {
                let err = TreeError::UnknownRowType {
                    id: row.id,
                    code: row.type_code,
                };
                warn!(
                    "event=node_fetch module=tree status=skip node_id={} error={err}",
                    row.id
                );
                skipped += 1;
                continue;
            };
            self.arena
                .add_child(handle, Node::from_stored(kind, row))
                .ok_or(TreeError::StaleAddress)?;
        }
        self.mark_fetched(handle);

        debug!(
            "event=node_fetch module=tree status=ok parent_id={} rows={total} skipped={skipped}",
            format_id(parent_id)
        );
        Ok(())
    }

    fn child_with_id(&self, parent: NodeHandle, id: NodeId) -> Option<NodeAddress> {
        let node = self.arena.get(parent)?;
        node.children()
            .iter()
            .enumerate()
            .find_map(|(row, &handle)| {
                let child = self.arena.get(handle)?;
                (child.id == Some(id)).then_some(NodeAddress { row, handle })
            })
    }

    fn mark_fetched(&mut self, handle: NodeHandle) {
        if let Some(node) = self.arena.get_mut(handle) {
            node.is_fetched = true;
        }
    }

    fn persisted_id(&self, handle: NodeHandle) -> Option<NodeId> {
        self.arena
            .get(handle)
            .filter(|node| node.kind() != NodeKind::Root)
            .and_then(|node| node.id)
    }

    fn describe(&self, address: Option<NodeAddress>) -> String {
        match address {
            None => "root".to_string(),
            Some(address) => format_id(self.arena.get(address.handle).and_then(|node| node.id)),
        }
    }
}

fn normalize_name(value: &str) -> TreeResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TreeError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn format_id(id: Option<NodeId>) -> String {
    id.map_or_else(|| "null".to_string(), |value| value.to_string())
}
