//! Script wrapper bindings and node lifetime
//!
//! A node stays alive while it is reachable from the document, held by a
//! native holder, or referenced by a queued mutation record. A live wrapper
//! counts as one holder. Destroying a subtree invalidates the wrappers of
//! every node in it; the handles keep resolving to `InvalidStateError`
//! until the runtime releases them.

use std::collections::{HashMap, HashSet};

use crate::document::Document;
use crate::error::{DomError, DomResult};
use crate::NodeId;

/// Script-visible wrapper handle; never reused within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapperId(u64);

impl WrapperId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapperSlot {
    Live(NodeId),
    /// Node destroyed while the wrapper was still alive
    Invalidated,
}

/// Handle -> node table
#[derive(Debug, Default)]
pub(crate) struct WrapperTable {
    last: u64,
    slots: HashMap<WrapperId, WrapperSlot>,
}

impl WrapperTable {
    fn allocate(&mut self, node: NodeId) -> WrapperId {
        self.last += 1;
        let id = WrapperId(self.last);
        self.slots.insert(id, WrapperSlot::Live(node));
        id
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, WrapperSlot::Live(_)))
            .count()
    }
}

impl Document {
    /// Wrapper handle for `node`, creating the binding on first use
    pub fn wrapper_for(&mut self, node: NodeId) -> DomResult<WrapperId> {
        let existing = self.node(node)?.wrapper;
        if let Some(handle) = existing {
            return Ok(handle);
        }

        let handle = self.wrappers.allocate(node);
        let Some(entry) = self.tree.get_mut(node) else {
            return Err(DomError::invalid_state("node has been destroyed"));
        };
        assert!(entry.wrapper.is_none(), "second wrapper created for {node}");
        entry.wrapper = Some(handle);
        entry.holders += 1;
        tracing::trace!(%node, handle = handle.0, "Wrapper bound");

        // Binding is recorded first so a reentrant lookup sees it
        if let Some(client) = self.wrapper_client.clone() {
            client.register_wrapper(node, handle);
        }
        Ok(handle)
    }

    pub fn existing_wrapper(&self, node: NodeId) -> Option<WrapperId> {
        self.tree.get(node).and_then(|n| n.wrapper)
    }

    /// Node behind a wrapper handle
    pub fn node_for(&self, handle: WrapperId) -> DomResult<NodeId> {
        match self.wrappers.slots.get(&handle) {
            Some(WrapperSlot::Live(node)) => {
                assert!(self.tree.contains(*node), "live wrapper points at freed node {node}");
                Ok(*node)
            }
            Some(WrapperSlot::Invalidated) => Err(DomError::invalid_state(
                "the node behind this wrapper has been destroyed",
            )),
            None => Err(DomError::invalid_state("unknown wrapper handle")),
        }
    }

    /// The runtime dropped its wrapper object
    ///
    /// Returns the number of nodes destroyed as a result.
    pub fn release_wrapper(&mut self, handle: WrapperId) -> usize {
        match self.wrappers.slots.remove(&handle) {
            Some(WrapperSlot::Live(node)) => {
                if let Some(entry) = self.tree.get_mut(node) {
                    assert_eq!(entry.wrapper, Some(handle), "wrapper table out of sync for {node}");
                    entry.wrapper = None;
                    entry.holders -= 1;
                }
                tracing::trace!(%node, handle = handle.0, "Wrapper released");
                self.collect_if_unreachable(node)
            }
            Some(WrapperSlot::Invalidated) | None => 0,
        }
    }

    /// Add a native strong holder
    pub fn retain(&mut self, node: NodeId) -> DomResult<()> {
        let entry = self
            .tree
            .get_mut(node)
            .ok_or_else(|| DomError::invalid_state("node has been destroyed"))?;
        entry.holders += 1;
        Ok(())
    }

    /// Drop a native strong holder, collecting the node's tree if that was
    /// the last thing keeping it alive
    pub fn release(&mut self, node: NodeId) -> usize {
        let Some(entry) = self.tree.get_mut(node) else {
            return 0;
        };
        assert!(entry.holders > 0, "release without matching retain on {node}");
        entry.holders -= 1;
        self.collect_if_unreachable(node)
    }

    pub fn holder_count(&self, node: NodeId) -> u32 {
        self.tree.get(node).map_or(0, |n| n.holders)
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.tree.contains(node)
    }

    pub fn live_wrapper_count(&self) -> usize {
        self.wrappers.live_count()
    }

    /// Reachable from the document, a holder, or a queued record
    pub fn is_reachable(&self, node: NodeId) -> bool {
        if !self.tree.contains(node) {
            return false;
        }
        let root = self.reachability_root(node);
        if root == self.root {
            return true;
        }
        let referenced: HashSet<NodeId> = self.notifier.referenced_nodes().into_iter().collect();
        self.subtree_is_held(root, &referenced)
    }

    /// Destroy `node`'s detached tree if nothing keeps it alive
    pub fn collect_if_unreachable(&mut self, node: NodeId) -> usize {
        if !self.tree.contains(node) {
            return 0;
        }
        let root = self.reachability_root(node);
        if root == self.root {
            return 0;
        }
        let referenced: HashSet<NodeId> = self.notifier.referenced_nodes().into_iter().collect();
        if self.subtree_is_held(root, &referenced) {
            return 0;
        }
        self.destroy_subtree(root)
    }

    /// Sweep every detached tree nothing holds
    pub fn collect_garbage(&mut self) -> usize {
        let referenced: HashSet<NodeId> = self.notifier.referenced_nodes().into_iter().collect();
        let detached_roots: Vec<NodeId> = self
            .tree
            .node_ids()
            .into_iter()
            .filter(|&id| {
                id != self.root
                    && self
                        .tree
                        .get(id)
                        .is_some_and(|n| n.parent.is_none() && !n.is_shadow_root())
            })
            .collect();

        let mut destroyed = 0;
        for root in detached_roots {
            if self.tree.contains(root) && !self.subtree_is_held(root, &referenced) {
                destroyed += self.destroy_subtree(root);
            }
        }
        if destroyed > 0 {
            tracing::debug!(destroyed, remaining = self.tree.len(), "Collected detached nodes");
        }
        destroyed
    }

    /// Free `root` and everything under it, shadow trees included
    ///
    /// Wrappers of destroyed nodes are invalidated, not released.
    pub(crate) fn destroy_subtree(&mut self, root: NodeId) -> usize {
        if self.tree.parent(root).is_some() {
            self.tree.unlink(root);
        }
        let doomed = self.composed_subtree(root);
        for &id in &doomed {
            let handle = self.tree.get(id).and_then(|n| n.wrapper);
            if let Some(handle) = handle {
                self.wrappers.slots.insert(handle, WrapperSlot::Invalidated);
                if let Some(client) = self.wrapper_client.clone() {
                    client.invalidate_wrapper(handle);
                }
            }
            self.notifier.forget_node(id);
            self.collections.forget_root(id);
            self.scopes.remove(&id);
        }
        for &id in &doomed {
            self.tree.remove_node(id);
        }
        tracing::trace!(%root, count = doomed.len(), "Subtree destroyed");
        doomed.len()
    }

    /// Inclusive pre-order subtree plus attached shadow trees
    pub(crate) fn composed_subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![root];
        while let Some(next) = pending.pop() {
            for id in self.tree.inclusive_descendants(next) {
                out.push(id);
                if let Some(shadow) = self.tree.get(id).and_then(|n| n.as_element()?.shadow_root) {
                    pending.push(shadow);
                }
            }
        }
        out
    }

    /// Tree root, following shadow roots out to their hosts
    fn reachability_root(&self, node: NodeId) -> NodeId {
        let mut current = node;
        loop {
            let root = self.tree.tree_root(current);
            match self.tree.get(root).and_then(|n| n.shadow_host()) {
                Some(host) => current = host,
                None => return root,
            }
        }
    }

    fn subtree_is_held(&self, root: NodeId, referenced: &HashSet<NodeId>) -> bool {
        self.composed_subtree(root).into_iter().any(|id| {
            referenced.contains(&id) || self.tree.get(id).is_some_and(|n| n.holders > 0)
        })
    }
}
