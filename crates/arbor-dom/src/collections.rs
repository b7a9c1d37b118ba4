//! Cached element collections
//!
//! `getElementsBy*` results are cached per (root, query) and stamped with the
//! document's tree version. A shape change bumps the version and so stales
//! every entry; class and name attribute changes don't touch the version, so
//! they drop the matching kind explicitly.

use std::collections::HashMap;
use std::rc::Rc;

use crate::document::Document;
use crate::node::Node;
use crate::NodeId;

/// Collection query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Lowercased local name, `*` for all elements
    TagName(String),
    /// Whitespace-separated class set, normalized
    ClassName(String),
    Name(String),
}

#[derive(Debug)]
struct CachedCollection {
    version: u64,
    nodes: Rc<[NodeId]>,
}

#[derive(Debug, Default)]
pub(crate) struct CollectionCache {
    entries: HashMap<(NodeId, CollectionKind), CachedCollection>,
}

impl CollectionCache {
    fn lookup(&self, root: NodeId, kind: &CollectionKind, version: u64) -> Option<Rc<[NodeId]>> {
        let entry = self.entries.get(&(root, kind.clone()))?;
        (entry.version == version).then(|| entry.nodes.clone())
    }

    fn store(&mut self, root: NodeId, kind: CollectionKind, version: u64, nodes: Rc<[NodeId]>) {
        self.entries
            .insert((root, kind), CachedCollection { version, nodes });
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Root is being destroyed
    pub(crate) fn forget_root(&mut self, root: NodeId) {
        self.entries.retain(|(r, _), _| *r != root);
    }

    pub(crate) fn invalidate_class_collections(&mut self) {
        self.entries
            .retain(|(_, kind), _| !matches!(kind, CollectionKind::ClassName(_)));
    }

    pub(crate) fn invalidate_name_collections(&mut self) {
        self.entries
            .retain(|(_, kind), _| !matches!(kind, CollectionKind::Name(_)));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Document {
    /// Descendant elements of `root` with the given tag name
    pub fn get_elements_by_tag_name(&mut self, root: NodeId, name: &str) -> Rc<[NodeId]> {
        let kind = CollectionKind::TagName(name.to_ascii_lowercase());
        self.cached_collection(root, kind)
    }

    /// Descendant elements of `root` carrying every class in `names`
    pub fn get_elements_by_class_name(&mut self, root: NodeId, names: &str) -> Rc<[NodeId]> {
        let mut classes: Vec<&str> = names.split_ascii_whitespace().collect();
        classes.sort_unstable();
        classes.dedup();
        self.cached_collection(root, CollectionKind::ClassName(classes.join(" ")))
    }

    /// Connected elements whose `name` attribute equals `name`
    pub fn get_elements_by_name(&mut self, name: &str) -> Rc<[NodeId]> {
        let root = self.root;
        self.cached_collection(root, CollectionKind::Name(name.to_string()))
    }

    fn cached_collection(&mut self, root: NodeId, kind: CollectionKind) -> Rc<[NodeId]> {
        let version = self.tree_version();
        if let Some(hit) = self.collections.lookup(root, &kind, version) {
            return hit;
        }
        let nodes: Rc<[NodeId]> = self.evaluate_collection(root, &kind).into();
        tracing::trace!(%root, ?kind, len = nodes.len(), "Collection evaluated");
        self.collections.store(root, kind, version, nodes.clone());
        nodes
    }

    fn evaluate_collection(&self, root: NodeId, kind: &CollectionKind) -> Vec<NodeId> {
        if let CollectionKind::Name(name) = kind {
            if root == self.root {
                return self
                    .scope(root)
                    .map(|s| s.get_elements_by_name(&self.tree, name))
                    .unwrap_or_default();
            }
        }

        let matches = |node: &Node| -> bool {
            let Some(el) = node.as_element() else {
                return false;
            };
            match kind {
                CollectionKind::TagName(tag) => tag == "*" || el.local_name() == tag.as_str(),
                CollectionKind::ClassName(classes) => {
                    !classes.is_empty() && classes.split(' ').all(|c| el.has_class(c))
                }
                CollectionKind::Name(name) => el.get_attr("name") == Some(name.as_str()),
            }
        };
        self.tree
            .descendants(root)
            .filter(|&id| self.tree.get(id).is_some_and(|n| matches(n)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentInit, EngineState};

    fn doc() -> Document {
        Document::new(Rc::new(EngineState::default()), DocumentInit::new())
    }

    #[test]
    fn test_tag_name_collection_follows_tree_version() {
        let mut doc = doc();
        let body = doc.body().unwrap();
        let p = doc.create_element("p").unwrap();
        doc.append_child(body, p).unwrap();

        let root = doc.root();
        let first = doc.get_elements_by_tag_name(root, "P");
        assert_eq!(&*first, &[p]);
        // Cached while the tree shape is unchanged
        assert!(Rc::ptr_eq(&first, &doc.get_elements_by_tag_name(root, "p")));

        let q = doc.create_element("p").unwrap();
        doc.append_child(body, q).unwrap();
        assert_eq!(&*doc.get_elements_by_tag_name(root, "p"), &[p, q]);
    }

    #[test]
    fn test_wildcard_tag_name() {
        let mut doc = doc();
        let root = doc.root();
        let all = doc.get_elements_by_tag_name(root, "*");
        // html, head, body
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], doc.document_element().unwrap());
    }

    #[test]
    fn test_class_collection_invalidated_by_attribute_change() {
        let mut doc = doc();
        let body = doc.body().unwrap();
        let div = doc.create_element("div").unwrap();
        doc.append_child(body, div).unwrap();
        doc.set_attribute(div, "class", "a b").unwrap();

        assert_eq!(&*doc.get_elements_by_class_name(body, "b a"), &[div]);
        assert!(doc.get_elements_by_class_name(body, "a c").is_empty());
        assert!(doc.get_elements_by_class_name(body, "   ").is_empty());

        doc.set_attribute(div, "class", "a c").unwrap();
        assert!(doc.get_elements_by_class_name(body, "a b").is_empty());
        assert_eq!(&*doc.get_elements_by_class_name(body, "c"), &[div]);
    }

    #[test]
    fn test_name_collection() {
        let mut doc = doc();
        let body = doc.body().unwrap();
        let a = doc.create_element("input").unwrap();
        let b = doc.create_element("input").unwrap();
        doc.set_attribute(a, "name", "q").unwrap();
        doc.set_attribute(b, "name", "q").unwrap();
        doc.append_child(body, b).unwrap();
        doc.insert_before(body, a, Some(b)).unwrap();

        assert_eq!(&*doc.get_elements_by_name("q"), &[a, b]);
        doc.remove_attribute(b, "name").unwrap();
        assert_eq!(&*doc.get_elements_by_name("q"), &[a]);
    }

    #[test]
    fn test_forget_root_drops_entries() {
        let mut doc = doc();
        let root = doc.root();
        doc.get_elements_by_tag_name(root, "body");
        assert_eq!(doc.collections.len(), 1);
        doc.collections.forget_root(root);
        assert_eq!(doc.collections.len(), 0);
    }
}
