//! DOM Tree (arena-based allocation)
//!
//! Pure topology: link bookkeeping and traversal. Validation, notifications
//! and index maintenance live in `mutate.rs`.

use std::cmp::Ordering;

use crate::arena::NodeArena;
use crate::node::Node;
use crate::NodeId;

/// Arena-based DOM tree
#[derive(Debug, Default)]
pub struct DomTree {
    nodes: NodeArena<Node>,
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
        }
    }

    /// Allocate a detached node
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All live node ids in slot order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.ids()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Iterate direct children
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).and_then(|n| n.first_child),
        }
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Pre-order descendants, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.get(id).and_then(|n| n.first_child),
        }
    }

    /// `id` followed by its pre-order descendants
    pub fn inclusive_descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(id).chain(self.descendants(id))
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Topmost ancestor (the node itself when detached)
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Link a detached `child` under `parent`, before `before` or at the end
    pub(crate) fn link_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        debug_assert!(self.parent(child).is_none(), "linking an attached node");

        let prev = match before {
            Some(before) => self.get(before).and_then(|n| n.prev_sibling),
            None => self.get(parent).and_then(|n| n.last_child),
        };

        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = before;
        }
        match prev {
            Some(prev) => {
                if let Some(n) = self.get_mut(prev) {
                    n.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = Some(child);
                }
            }
        }
        match before {
            Some(before) => {
                if let Some(n) = self.get_mut(before) {
                    n.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = Some(child);
                }
            }
        }
    }

    /// Detach `child` from its parent, leaving its own subtree intact
    pub(crate) fn unlink(&mut self, child: NodeId) {
        let Some(node) = self.get(child) else { return };
        let Some(parent) = node.parent else { return };
        let (prev, next) = (node.prev_sibling, node.next_sibling);

        match prev {
            Some(prev) => {
                if let Some(n) = self.get_mut(prev) {
                    n.next_sibling = next;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match next {
            Some(next) => {
                if let Some(n) = self.get_mut(next) {
                    n.prev_sibling = prev;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = prev;
                }
            }
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Free a node's storage; the caller has already unlinked it
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// Document order of two nodes in the same tree
    ///
    /// Nodes in different trees compare by their roots' ids so the result is
    /// still a total order.
    pub fn compare_tree_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let mut path_a: Vec<NodeId> = self.ancestors(a).collect();
        path_a.reverse();
        path_a.push(a);
        let mut path_b: Vec<NodeId> = self.ancestors(b).collect();
        path_b.reverse();
        path_b.push(b);

        if path_a[0] != path_b[0] {
            return path_a[0].cmp(&path_b[0]);
        }

        let common = path_a
            .iter()
            .zip(path_b.iter())
            .take_while(|(x, y)| x == y)
            .count();

        // One is an ancestor of the other
        if common == path_a.len() {
            return Ordering::Less;
        }
        if common == path_b.len() {
            return Ordering::Greater;
        }

        let (branch_a, branch_b) = (path_a[common], path_b[common]);
        let parent = path_a[common - 1];
        for child in self.children(parent) {
            if child == branch_a {
                return Ordering::Less;
            }
            if child == branch_b {
                return Ordering::Greater;
            }
        }
        Ordering::Equal
    }
}

/// Iterator over direct children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Pre-order iterator bounded by a subtree root
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        let node = self.tree.get(current)?;

        self.next = if let Some(first) = node.first_child {
            Some(first)
        } else {
            // Climb until a next sibling exists, never past the root
            let mut cursor = current;
            loop {
                if cursor == self.root {
                    break None;
                }
                let Some(n) = self.tree.get(cursor) else { break None };
                if let Some(sibling) = n.next_sibling {
                    break Some(sibling);
                }
                match n.parent {
                    Some(parent) => cursor = parent,
                    None => break None,
                }
            }
        };
        Some(current)
    }
}

/// Iterator over ancestors
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
