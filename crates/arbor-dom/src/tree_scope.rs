//! Tree scopes and their id/name indexes
//!
//! One scope per document and per shadow root. Buckets are unordered for
//! O(1) add/remove; lookups pick the tree-order-first element, so a lookup
//! costs O(k) for k elements sharing a key.

use std::collections::HashMap;
use std::rc::Rc;

use crate::tree::DomTree;
use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeScopeKind {
    Document,
    ShadowRoot,
}

/// Notified after a mutation that may have changed which element an id
/// resolves to
pub trait IdTargetObserver {
    fn id_target_changed(&self, id: &str);
}

/// Per-scope id/name index
pub struct TreeScope {
    root: NodeId,
    kind: TreeScopeKind,
    ids: HashMap<String, Vec<NodeId>>,
    names: HashMap<String, Vec<NodeId>>,
    id_observers: HashMap<String, Vec<Rc<dyn IdTargetObserver>>>,
    pending_id_targets: Vec<String>,
}

impl std::fmt::Debug for TreeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeScope")
            .field("root", &self.root)
            .field("kind", &self.kind)
            .field("ids", &self.ids)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl TreeScope {
    pub fn new(root: NodeId, kind: TreeScopeKind) -> Self {
        Self {
            root,
            kind,
            ids: HashMap::new(),
            names: HashMap::new(),
            id_observers: HashMap::new(),
            pending_id_targets: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self) -> TreeScopeKind {
        self.kind
    }

    pub fn add_element_by_id(&mut self, id: &str, element: NodeId) {
        let bucket = self.ids.entry(id.to_string()).or_default();
        debug_assert!(!bucket.contains(&element), "element indexed twice under one id");
        bucket.push(element);
        self.mark_id_target_changed(id);
    }

    pub fn remove_element_by_id(&mut self, id: &str, element: NodeId) {
        if remove_from_bucket(&mut self.ids, id, element) {
            self.mark_id_target_changed(id);
        }
    }

    pub fn add_element_by_name(&mut self, name: &str, element: NodeId) {
        self.names.entry(name.to_string()).or_default().push(element);
    }

    pub fn remove_element_by_name(&mut self, name: &str, element: NodeId) {
        remove_from_bucket(&mut self.names, name, element);
    }

    /// Tree-order-first element carrying `id`
    pub fn get_element_by_id(&self, tree: &DomTree, id: &str) -> Option<NodeId> {
        first_in_tree_order(tree, self.ids.get(id)?)
    }

    pub fn contains_multiple_elements_with_id(&self, id: &str) -> bool {
        self.ids.get(id).is_some_and(|bucket| bucket.len() > 1)
    }

    /// Elements carrying `name`, in tree order
    pub fn get_elements_by_name(&self, tree: &DomTree, name: &str) -> Vec<NodeId> {
        let mut found = self.names.get(name).cloned().unwrap_or_default();
        found.sort_by(|a, b| tree.compare_tree_order(*a, *b));
        found
    }

    pub fn id_count(&self) -> usize {
        self.ids.values().map(Vec::len).sum()
    }

    pub fn name_count(&self) -> usize {
        self.names.values().map(Vec::len).sum()
    }

    pub fn add_id_target_observer(&mut self, id: &str, observer: Rc<dyn IdTargetObserver>) {
        self.id_observers.entry(id.to_string()).or_default().push(observer);
    }

    pub fn remove_id_target_observer(&mut self, id: &str, observer: &Rc<dyn IdTargetObserver>) {
        if let Some(list) = self.id_observers.get_mut(id) {
            list.retain(|o| !Rc::ptr_eq(o, observer));
            if list.is_empty() {
                self.id_observers.remove(id);
            }
        }
    }

    fn mark_id_target_changed(&mut self, id: &str) {
        if self.id_observers.contains_key(id) && !self.pending_id_targets.iter().any(|p| p == id) {
            self.pending_id_targets.push(id.to_string());
        }
    }

    /// Drain ids whose target may have changed with the observers to notify
    pub(crate) fn take_pending_id_targets(
        &mut self,
    ) -> Vec<(String, Vec<Rc<dyn IdTargetObserver>>)> {
        std::mem::take(&mut self.pending_id_targets)
            .into_iter()
            .filter_map(|id| {
                let observers = self.id_observers.get(&id)?.clone();
                Some((id, observers))
            })
            .collect()
    }
}

fn remove_from_bucket(map: &mut HashMap<String, Vec<NodeId>>, key: &str, element: NodeId) -> bool {
    let Some(bucket) = map.get_mut(key) else {
        return false;
    };
    let Some(pos) = bucket.iter().position(|e| *e == element) else {
        return false;
    };
    bucket.swap_remove(pos);
    if bucket.is_empty() {
        map.remove(key);
    }
    true
}

fn first_in_tree_order(tree: &DomTree, bucket: &[NodeId]) -> Option<NodeId> {
    bucket
        .iter()
        .copied()
        .min_by(|a, b| tree.compare_tree_order(*a, *b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use std::cell::RefCell;

    fn tree_with_two() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let root = tree.insert(Node::document());
        let first = tree.insert(Node::element("div"));
        let second = tree.insert(Node::element("div"));
        tree.link_before(root, first, None);
        tree.link_before(root, second, None);
        (tree, root, first, second)
    }

    #[test]
    fn test_get_element_by_id_prefers_tree_order() {
        let (tree, root, first, second) = tree_with_two();
        let mut scope = TreeScope::new(root, TreeScopeKind::Document);

        // Indexed out of tree order
        scope.add_element_by_id("dup", second);
        scope.add_element_by_id("dup", first);
        assert_eq!(scope.get_element_by_id(&tree, "dup"), Some(first));
        assert!(scope.contains_multiple_elements_with_id("dup"));

        scope.remove_element_by_id("dup", first);
        assert_eq!(scope.get_element_by_id(&tree, "dup"), Some(second));
        scope.remove_element_by_id("dup", second);
        assert_eq!(scope.get_element_by_id(&tree, "dup"), None);
        assert_eq!(scope.id_count(), 0);
    }

    #[test]
    fn test_names_in_tree_order() {
        let (tree, root, first, second) = tree_with_two();
        let mut scope = TreeScope::new(root, TreeScopeKind::Document);
        scope.add_element_by_name("q", second);
        scope.add_element_by_name("q", first);

        assert_eq!(scope.get_elements_by_name(&tree, "q"), vec![first, second]);
        scope.remove_element_by_name("q", first);
        assert_eq!(scope.name_count(), 1);
    }

    struct Recorder(RefCell<Vec<String>>);

    impl IdTargetObserver for Recorder {
        fn id_target_changed(&self, id: &str) {
            self.0.borrow_mut().push(id.to_string());
        }
    }

    #[test]
    fn test_id_target_changes_are_deferred() {
        let (_, root, first, _) = tree_with_two();
        let mut scope = TreeScope::new(root, TreeScopeKind::Document);
        let recorder = Rc::new(Recorder(RefCell::new(Vec::new())));
        scope.add_id_target_observer("x", recorder.clone());

        scope.add_element_by_id("x", first);
        scope.add_element_by_id("other", first);
        scope.remove_element_by_id("x", first);
        assert!(recorder.0.borrow().is_empty());

        let pending = scope.take_pending_id_targets();
        assert_eq!(pending.len(), 1);
        for (id, observers) in pending {
            for observer in observers {
                observer.id_target_changed(&id);
            }
        }
        assert_eq!(*recorder.0.borrow(), vec!["x".to_string()]);
    }
}
