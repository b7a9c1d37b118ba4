//! Capability surface
//!
//! Each node kind exposes a subset of {traversal, attributes, event
//! targeting, tree-scope membership}. [`NodeRef`] implements every trait;
//! the `as_*` selectors hand out a trait object only when the node's type
//! tag carries the capability, so callers never downcast.

use bitflags::bitflags;

use crate::document::Document;
use crate::error::DomResult;
use crate::flags::NodeFlags;
use crate::node::{Node, NodeType};
use crate::NodeId;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const TRAVERSABLE = 1 << 0;
        const ATTRIBUTE_HOLDER = 1 << 1;
        const EVENT_TARGET = 1 << 2;
        const TREE_SCOPE_MEMBER = 1 << 3;
        const CONTAINER = 1 << 4;
    }
}

impl NodeType {
    pub fn capabilities(self) -> Capabilities {
        let base = Capabilities::TRAVERSABLE
            | Capabilities::EVENT_TARGET
            | Capabilities::TREE_SCOPE_MEMBER;
        match self {
            NodeType::Element => base | Capabilities::ATTRIBUTE_HOLDER | Capabilities::CONTAINER,
            NodeType::Document | NodeType::DocumentFragment => base | Capabilities::CONTAINER,
            NodeType::Text
            | NodeType::Comment
            | NodeType::ProcessingInstruction
            | NodeType::DocumentType => base,
        }
    }
}

/// Child/sibling navigation
pub trait Traversable {
    fn parent_node(&self) -> Option<NodeId>;
    fn first_child(&self) -> Option<NodeId>;
    fn last_child(&self) -> Option<NodeId>;
    fn previous_sibling(&self) -> Option<NodeId>;
    fn next_sibling(&self) -> Option<NodeId>;
    fn child_nodes(&self) -> Vec<NodeId>;
}

pub trait AttributeHolder {
    fn get_attribute(&self, name: &str) -> Option<&str>;
    fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }
    fn attribute_names(&self) -> Vec<String>;
}

/// Event propagation path; shadow roots retarget to their host
pub trait EventTarget {
    fn event_target_parent(&self) -> Option<NodeId>;
    fn event_path(&self) -> Vec<NodeId>;
}

pub trait TreeScopeMember {
    /// Root of the scope the node is indexed in, `None` while detached
    fn tree_scope(&self) -> Option<NodeId>;
    fn is_in_shadow_tree(&self) -> bool;
    fn containing_shadow_host(&self) -> Option<NodeId>;
}

/// Borrowed view of one live node
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn node_type(&self) -> NodeType {
        self.node.node_type()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.node_type().capabilities()
    }

    pub fn as_traversable(&self) -> Option<&dyn Traversable> {
        self.capabilities()
            .contains(Capabilities::TRAVERSABLE)
            .then_some(self as &dyn Traversable)
    }

    pub fn as_attribute_holder(&self) -> Option<&dyn AttributeHolder> {
        self.capabilities()
            .contains(Capabilities::ATTRIBUTE_HOLDER)
            .then_some(self as &dyn AttributeHolder)
    }

    pub fn as_event_target(&self) -> Option<&dyn EventTarget> {
        self.capabilities()
            .contains(Capabilities::EVENT_TARGET)
            .then_some(self as &dyn EventTarget)
    }

    pub fn as_tree_scope_member(&self) -> Option<&dyn TreeScopeMember> {
        self.capabilities()
            .contains(Capabilities::TREE_SCOPE_MEMBER)
            .then_some(self as &dyn TreeScopeMember)
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("type", &self.node_type())
            .finish()
    }
}

impl Traversable for NodeRef<'_> {
    fn parent_node(&self) -> Option<NodeId> {
        self.node.parent()
    }

    fn first_child(&self) -> Option<NodeId> {
        self.node.first_child()
    }

    fn last_child(&self) -> Option<NodeId> {
        self.node.last_child()
    }

    fn previous_sibling(&self) -> Option<NodeId> {
        self.node.previous_sibling()
    }

    fn next_sibling(&self) -> Option<NodeId> {
        self.node.next_sibling()
    }

    fn child_nodes(&self) -> Vec<NodeId> {
        self.doc.tree().children(self.id).collect()
    }
}

impl AttributeHolder for NodeRef<'_> {
    fn get_attribute(&self, name: &str) -> Option<&str> {
        self.doc.get_attribute(self.id, name)
    }

    fn attribute_names(&self) -> Vec<String> {
        self.doc.attribute_names(self.id)
    }
}

impl EventTarget for NodeRef<'_> {
    fn event_target_parent(&self) -> Option<NodeId> {
        self.node.parent().or_else(|| self.node.shadow_host())
    }

    fn event_path(&self) -> Vec<NodeId> {
        let mut path = vec![self.id];
        let mut current = self.event_target_parent();
        while let Some(id) = current {
            path.push(id);
            current = self
                .doc
                .get(id)
                .and_then(|n| n.parent().or_else(|| n.shadow_host()));
        }
        path
    }
}

impl TreeScopeMember for NodeRef<'_> {
    fn tree_scope(&self) -> Option<NodeId> {
        self.node.tree_scope()
    }

    fn is_in_shadow_tree(&self) -> bool {
        self.node.flags().contains(NodeFlags::IN_SHADOW_TREE)
    }

    fn containing_shadow_host(&self) -> Option<NodeId> {
        let scope = self.tree_scope()?;
        self.doc.get(scope)?.shadow_host()
    }
}

impl Document {
    /// Capability view of `id`; `InvalidStateError` once the node is gone
    pub fn node_ref(&self, id: NodeId) -> DomResult<NodeRef<'_>> {
        let node = self.node(id)?;
        Ok(NodeRef { doc: self, id, node })
    }
}
