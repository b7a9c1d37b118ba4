//! DOM Node - arena entry
//!
//! Links are plain `Option<NodeId>` lookups. Storage is owned by the arena;
//! whether a node stays alive is decided by reachability from the document,
//! native holders and live wrappers (see `binding.rs`).

use crate::attributes::AttributeData;
use crate::binding::WrapperId;
use crate::flags::NodeFlags;
use crate::NodeId;

/// Node type tag (values match the DOM `nodeType` constants)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
}

impl NodeType {
    /// Can hold children
    pub fn is_container(self) -> bool {
        matches!(self, Self::Element | Self::Document | Self::DocumentFragment)
    }

    pub fn is_character_data(self) -> bool {
        matches!(self, Self::Text | Self::Comment | Self::ProcessingInstruction)
    }
}

/// DOM Node - core structure
#[derive(Debug)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) flags: NodeFlags,
    /// Root of the containing tree scope (document or shadow root)
    pub(crate) tree_scope: Option<NodeId>,
    /// Native strong holders, a live wrapper counts as one
    pub(crate) holders: u32,
    pub(crate) wrapper: Option<WrapperId>,
    pub(crate) data: NodeData,
}

impl Node {
    fn with_data(data: NodeData, flags: NodeFlags) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            flags,
            tree_scope: None,
            holders: 0,
            wrapper: None,
            data,
        }
    }

    /// Create a new element node
    pub fn element(local_name: impl Into<String>) -> Self {
        Self::with_data(
            NodeData::Element(ElementData::new(local_name.into())),
            NodeFlags::IS_ELEMENT | NodeFlags::IS_CONTAINER,
        )
    }

    /// Create a new text node
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_data(NodeData::Text(content.into()), NodeFlags::IS_TEXT)
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::with_data(NodeData::Comment(content.into()), NodeFlags::empty())
    }

    pub fn processing_instruction(target: impl Into<String>, data: impl Into<String>) -> Self {
        Self::with_data(
            NodeData::ProcessingInstruction {
                target: target.into(),
                data: data.into(),
            },
            NodeFlags::empty(),
        )
    }

    pub fn doctype(
        name: impl Into<String>,
        public_id: impl Into<String>,
        system_id: impl Into<String>,
    ) -> Self {
        Self::with_data(
            NodeData::DocumentType {
                name: name.into(),
                public_id: public_id.into(),
                system_id: system_id.into(),
            },
            NodeFlags::empty(),
        )
    }

    pub fn fragment() -> Self {
        Self::with_data(
            NodeData::DocumentFragment { shadow_host: None },
            NodeFlags::IS_CONTAINER | NodeFlags::IS_DOCUMENT_FRAGMENT,
        )
    }

    pub(crate) fn shadow_root(host: NodeId) -> Self {
        Self::with_data(
            NodeData::DocumentFragment {
                shadow_host: Some(host),
            },
            NodeFlags::IS_CONTAINER
                | NodeFlags::IS_DOCUMENT_FRAGMENT
                | NodeFlags::IS_SHADOW_ROOT
                | NodeFlags::IN_SHADOW_TREE,
        )
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(
            NodeData::Document,
            NodeFlags::IS_CONTAINER | NodeFlags::IN_DOCUMENT,
        )
    }

    pub fn node_type(&self) -> NodeType {
        match &self.data {
            NodeData::Document => NodeType::Document,
            NodeData::DocumentType { .. } => NodeType::DocumentType,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
            NodeData::DocumentFragment { .. } => NodeType::DocumentFragment,
        }
    }

    /// `nodeName` as scripts see it
    pub fn node_name(&self) -> String {
        match &self.data {
            NodeData::Document => "#document".to_string(),
            NodeData::DocumentType { name, .. } => name.clone(),
            NodeData::Element(e) => e.local_name.to_ascii_uppercase(),
            NodeData::Text(_) => "#text".to_string(),
            NodeData::Comment(_) => "#comment".to_string(),
            NodeData::ProcessingInstruction { target, .. } => target.clone(),
            NodeData::DocumentFragment { .. } => "#document-fragment".to_string(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    pub fn previous_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn tree_scope(&self) -> Option<NodeId> {
        self.tree_scope
    }

    pub fn holder_count(&self) -> u32 {
        self.holders
    }

    pub fn wrapper(&self) -> Option<WrapperId> {
        self.wrapper
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        self.flags.contains(NodeFlags::IS_ELEMENT)
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        self.flags.contains(NodeFlags::IS_TEXT)
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.flags.contains(NodeFlags::IS_CONTAINER)
    }

    #[inline]
    pub fn is_shadow_root(&self) -> bool {
        self.flags.contains(NodeFlags::IS_SHADOW_ROOT)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.flags.contains(NodeFlags::IN_DOCUMENT)
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Text, comment or processing-instruction payload
    pub fn character_data(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t),
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    pub(crate) fn character_data_mut(&mut self) -> Option<&mut String> {
        match &mut self.data {
            NodeData::Text(t) | NodeData::Comment(t) => Some(t),
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Host element if this node is a shadow root
    pub fn shadow_host(&self) -> Option<NodeId> {
        match &self.data {
            NodeData::DocumentFragment { shadow_host } => *shadow_host,
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// DOCTYPE
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
    /// Processing instruction
    ProcessingInstruction { target: String, data: String },
    /// Fragment, or a shadow root when `shadow_host` is set
    DocumentFragment { shadow_host: Option<NodeId> },
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    /// Lower-cased tag name
    pub(crate) local_name: String,
    pub(crate) attrs: AttributeData,
    /// Cached id attribute (very common lookup)
    pub(crate) id: Option<String>,
    /// Cached class list
    pub(crate) classes: Vec<String>,
    pub(crate) shadow_root: Option<NodeId>,
}

impl ElementData {
    pub fn new(local_name: String) -> Self {
        Self {
            local_name,
            attrs: AttributeData::default(),
            id: None,
            classes: Vec::new(),
            shadow_root: None,
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn attributes(&self) -> &AttributeData {
        &self.attrs
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn shadow_root(&self) -> Option<NodeId> {
        self.shadow_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_types_and_flags() {
        let el = Node::element("div");
        assert_eq!(el.node_type(), NodeType::Element);
        assert!(el.is_element() && el.is_container());
        assert_eq!(el.node_name(), "DIV");

        let text = Node::text("hi");
        assert!(text.is_text());
        assert!(!text.is_container());
        assert_eq!(text.as_text(), Some("hi"));
        assert_eq!(text.node_name(), "#text");

        let doc = Node::document();
        assert!(doc.is_connected());
        assert_eq!(doc.node_type() as u8, 9);
    }

    #[test]
    fn test_character_data_accessors() {
        let mut pi = Node::processing_instruction("xml-stylesheet", "href=a.css");
        assert_eq!(pi.character_data(), Some("href=a.css"));
        pi.character_data_mut().unwrap().push_str(" type=text/css");
        assert_eq!(pi.character_data(), Some("href=a.css type=text/css"));
        assert!(Node::element("p").character_data().is_none());
    }
}
