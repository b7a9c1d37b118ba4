//! Node flag bitset

use bitflags::bitflags;

bitflags! {
    /// Per-node state bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        const IS_TEXT = 1 << 1;
        const IS_CONTAINER = 1 << 2;
        const IS_ELEMENT = 1 << 3;
        const IS_DOCUMENT_FRAGMENT = 1 << 6;
        const IS_SHADOW_ROOT = 1 << 7;

        /// Connected to the document tree
        const IN_DOCUMENT = 1 << 10;
        /// Lives under a shadow root
        const IN_SHADOW_TREE = 1 << 11;
        /// The parser has closed this element (script-created ones start closed)
        const FINISHED_PARSING_CHILDREN = 1 << 12;

        const CHILD_NEEDS_STYLE_RECALC = 1 << 18;
        // Two-bit style change tri-state, see `StyleChangeType`
        const STYLE_CHANGE_LOW = 1 << 19;
        const STYLE_CHANGE_HIGH = 1 << 20;

        const HAS_ID = 1 << 22;
        const HAS_CLASS = 1 << 23;
        const HAS_NAME = 1 << 24;

        const IN_TREE_SCOPE = Self::IN_DOCUMENT.bits() | Self::IN_SHADOW_TREE.bits();
        const STYLE_CHANGE_MASK = Self::STYLE_CHANGE_LOW.bits() | Self::STYLE_CHANGE_HIGH.bits();
    }
}

/// Pending style invalidation for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StyleChangeType {
    NoStyleChange,
    LocalStyleChange,
    SubtreeStyleChange,
}

impl NodeFlags {
    pub fn style_change_type(self) -> StyleChangeType {
        let bits = self & Self::STYLE_CHANGE_MASK;
        if bits == Self::STYLE_CHANGE_HIGH {
            StyleChangeType::SubtreeStyleChange
        } else if bits == Self::STYLE_CHANGE_LOW {
            StyleChangeType::LocalStyleChange
        } else {
            StyleChangeType::NoStyleChange
        }
    }

    pub fn set_style_change_type(&mut self, change: StyleChangeType) {
        self.remove(Self::STYLE_CHANGE_MASK);
        match change {
            StyleChangeType::NoStyleChange => {}
            StyleChangeType::LocalStyleChange => self.insert(Self::STYLE_CHANGE_LOW),
            StyleChangeType::SubtreeStyleChange => self.insert(Self::STYLE_CHANGE_HIGH),
        }
    }

    /// Connected to the document or to a shadow tree
    pub fn is_in_tree_scope(self) -> bool {
        self.intersects(Self::IN_TREE_SCOPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_change_tristate() {
        let mut flags = NodeFlags::IS_ELEMENT;
        assert_eq!(flags.style_change_type(), StyleChangeType::NoStyleChange);

        flags.set_style_change_type(StyleChangeType::LocalStyleChange);
        assert_eq!(flags.style_change_type(), StyleChangeType::LocalStyleChange);

        flags.set_style_change_type(StyleChangeType::SubtreeStyleChange);
        assert_eq!(flags.style_change_type(), StyleChangeType::SubtreeStyleChange);
        assert!(flags.contains(NodeFlags::IS_ELEMENT));

        flags.set_style_change_type(StyleChangeType::NoStyleChange);
        assert!(!flags.intersects(NodeFlags::STYLE_CHANGE_MASK));
    }

    #[test]
    fn test_tree_scope_membership() {
        assert!(!NodeFlags::IS_ELEMENT.is_in_tree_scope());
        assert!(NodeFlags::IN_DOCUMENT.is_in_tree_scope());
        assert!(NodeFlags::IN_SHADOW_TREE.is_in_tree_scope());
    }
}
