//! DOM Node Operations
//!
//! appendChild, insertBefore, removeChild, replaceChild, cloneNode and the
//! node factories.
//!
//! Ordering for one structural change:
//! 1. `node_will_be_removed` for the removed subtree (pre-order), detach
//!    bookkeeping for observers and the child-list record, all before unlink
//! 2. tree-version stamp, relink
//! 3. scope flags and id/name indexes for the affected subtree in one pass
//! 4. `inserted_into` / `children_changed`

use crate::attributes::{Attribute, AttributeData};
use crate::client::{ChildrenChange, ChildrenChangeKind};
use crate::document::Document;
use crate::element::is_valid_name;
use crate::error::{DomError, DomResult};
use crate::flags::{NodeFlags, StyleChangeType};
use crate::mutation::MutationRecord;
use crate::node::{Node, NodeData, NodeType};
use crate::tree_scope::{TreeScope, TreeScopeKind};
use crate::NodeId;

impl Document {
    // ---- Factories ----

    /// `createElement`: validated and lower-cased
    pub fn create_element(&mut self, tag_name: &str) -> DomResult<NodeId> {
        if !is_valid_name(tag_name) {
            return Err(DomError::InvalidCharacter(format!(
                "'{tag_name}' is not a valid element name"
            )));
        }
        let mut node = Node::element(tag_name.to_ascii_lowercase());
        node.flags.insert(NodeFlags::FINISHED_PARSING_CHILDREN);
        let id = self.tree.insert(node);
        tracing::trace!(%id, tag_name, "Element created");
        Ok(id)
    }

    /// Element for the parser: attributes go through the shared-block cache
    /// and the element stays open until `finish_parsing_children`
    pub fn create_element_for_parser(&mut self, local_name: &str, attrs: Vec<Attribute>) -> NodeId {
        let id = self.tree.insert(Node::element(local_name.to_ascii_lowercase()));
        self.parser_set_attributes(id, attrs);
        id
    }

    pub fn finish_parsing_children(&mut self, element: NodeId) {
        if let Some(node) = self.tree.get_mut(element) {
            node.flags.insert(NodeFlags::FINISHED_PARSING_CHILDREN);
        }
    }

    pub fn create_text_node(&mut self, data: &str) -> NodeId {
        self.tree.insert(Node::text(data))
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.tree.insert(Node::comment(data))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> DomResult<NodeId> {
        if !is_valid_name(target) {
            return Err(DomError::InvalidCharacter(format!(
                "'{target}' is not a valid processing instruction target"
            )));
        }
        if data.contains("?>") {
            return Err(DomError::InvalidCharacter(
                "processing instruction data contains '?>'".into(),
            ));
        }
        Ok(self.tree.insert(Node::processing_instruction(target, data)))
    }

    pub fn create_document_type(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.tree.insert(Node::doctype(name, public_id, system_id))
    }

    pub fn create_document_fragment(&mut self) -> NodeId {
        self.tree.insert(Node::fragment())
    }

    // ---- Structural mutation ----

    /// Insert `new_child` before `ref_child` (or at the end)
    ///
    /// Inserting a fragment moves its children and leaves it empty.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        ref_child: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.ensure_pre_insertion_validity(parent, new_child, ref_child, None)?;
        // Inserting a node before itself
        let reference = if ref_child == Some(new_child) {
            self.tree.get(new_child).and_then(|n| n.next_sibling)
        } else {
            ref_child
        };
        self.insert_validated(parent, new_child, reference, false);
        self.notify_id_targets();
        Ok(new_child)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Parser-side append: validated the same way, reported as parser work
    pub fn parser_append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.ensure_pre_insertion_validity(parent, child, None, None)?;
        self.insert_validated(parent, child, None, true);
        self.notify_id_targets();
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotFound(
                "the node to be removed is not a child of this node".into(),
            ));
        }
        self.remove_validated(parent, child, true);
        self.notify_id_targets();
        Ok(child)
    }

    /// Replace `old_child` with `new_child`, returning `old_child`
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        if self.node(old_child)?.parent != Some(parent) {
            return Err(DomError::NotFound(
                "the node to be replaced is not a child of this node".into(),
            ));
        }
        self.ensure_pre_insertion_validity(parent, new_child, Some(old_child), Some(old_child))?;
        if new_child == old_child {
            return Ok(old_child);
        }

        let mut reference = self.tree.get(old_child).and_then(|n| n.next_sibling);
        if reference == Some(new_child) {
            reference = self.tree.get(new_child).and_then(|n| n.next_sibling);
        }
        self.remove_validated(parent, old_child, true);
        self.insert_validated(parent, new_child, reference, false);
        self.notify_id_targets();
        Ok(old_child)
    }

    /// Remove every child of `node`; the caller queues the child-list record
    pub(crate) fn remove_all_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let children: Vec<NodeId> = self.tree.children(node).collect();
        for &child in &children {
            self.remove_validated(node, child, false);
        }
        children
    }

    fn ensure_pre_insertion_validity(
        &self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
        replacing: Option<NodeId>,
    ) -> DomResult<()> {
        let parent_node = self.node(parent)?;
        let new_node = self.node(node)?;

        if !parent_node.is_container() {
            return Err(DomError::hierarchy("this node type does not support children"));
        }
        if self.is_host_including_inclusive_ancestor(node, parent) {
            return Err(DomError::hierarchy("the new child contains the parent"));
        }
        if let Some(child) = child {
            if self.node(child)?.parent != Some(parent) {
                return Err(DomError::NotFound(
                    "the reference node is not a child of this node".into(),
                ));
            }
        }

        let parent_is_document = parent_node.node_type() == NodeType::Document;
        match new_node.node_type() {
            NodeType::Document => {
                return Err(DomError::hierarchy("a Document can never be inserted"));
            }
            NodeType::DocumentFragment if new_node.is_shadow_root() => {
                return Err(DomError::hierarchy("a shadow root can never be inserted"));
            }
            NodeType::DocumentType if !parent_is_document => {
                return Err(DomError::hierarchy("a doctype can only be a child of a Document"));
            }
            NodeType::Text if parent_is_document => {
                return Err(DomError::hierarchy("text cannot be a child of a Document"));
            }
            _ => {}
        }
        if !parent_is_document {
            return Ok(());
        }

        // Document: one element, one doctype, doctype before the element
        let count_children = |kind: NodeType| {
            self.tree
                .children(parent)
                .filter(|&c| Some(c) != replacing)
                .filter(|&c| self.tree.get(c).is_some_and(|n| n.node_type() == kind))
                .count()
        };
        let doctype_after = |start: Option<NodeId>| {
            let mut cursor = start;
            while let Some(id) = cursor {
                let Some(n) = self.tree.get(id) else { break };
                if Some(id) != replacing && n.node_type() == NodeType::DocumentType {
                    return true;
                }
                cursor = n.next_sibling;
            }
            false
        };
        let element_before = |start: Option<NodeId>| {
            let mut cursor = start.and_then(|c| self.tree.get(c)?.prev_sibling);
            while let Some(id) = cursor {
                let Some(n) = self.tree.get(id) else { break };
                if Some(id) != replacing && n.is_element() {
                    return true;
                }
                cursor = n.prev_sibling;
            }
            false
        };
        let child_is_doctype = child.is_some_and(|c| {
            Some(c) != replacing
                && self
                    .tree
                    .get(c)
                    .is_some_and(|n| n.node_type() == NodeType::DocumentType)
        });

        match new_node.node_type() {
            NodeType::DocumentFragment => {
                let elements = self
                    .tree
                    .children(node)
                    .filter(|&c| self.tree.get(c).is_some_and(Node::is_element))
                    .count();
                let has_text = self
                    .tree
                    .children(node)
                    .any(|c| self.tree.get(c).is_some_and(Node::is_text));
                if elements > 1 || has_text {
                    return Err(DomError::hierarchy("a Document can have only one element child"));
                }
                let has_element = count_children(NodeType::Element) > 0;
                if elements == 1 && (has_element || child_is_doctype || doctype_after(child)) {
                    return Err(DomError::hierarchy("a Document can have only one element child"));
                }
            }
            NodeType::Element => {
                let has_element = count_children(NodeType::Element) > 0;
                if has_element || child_is_doctype || doctype_after(child) {
                    return Err(DomError::hierarchy("a Document can have only one element child"));
                }
            }
            NodeType::DocumentType => {
                let misplaced = match child {
                    Some(_) => element_before(child),
                    None => count_children(NodeType::Element) > 0,
                };
                if count_children(NodeType::DocumentType) > 0 || misplaced {
                    return Err(DomError::hierarchy("a Document can have only one doctype"));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `ancestor` contains `node`, looking through shadow roots to hosts
    fn is_host_including_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            let Some(n) = self.tree.get(id) else { return false };
            current = n.parent.or_else(|| n.shadow_host());
        }
        false
    }

    fn insert_validated(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: Option<NodeId>,
        by_parser: bool,
    ) {
        let is_fragment = self
            .tree
            .get(new_child)
            .is_some_and(|n| n.node_type() == NodeType::DocumentFragment);

        let nodes = if is_fragment {
            let moved = self.remove_all_children(new_child);
            if !moved.is_empty() {
                self.notifier.enqueue(
                    &self.tree,
                    MutationRecord::child_list(new_child, Vec::new(), moved.clone(), None, None),
                );
            }
            moved
        } else {
            if let Some(old_parent) = self.tree.parent(new_child) {
                self.remove_validated(old_parent, new_child, true);
            }
            vec![new_child]
        };
        if nodes.is_empty() {
            return;
        }

        let previous_sibling = match reference {
            Some(r) => self.tree.get(r).and_then(|n| n.prev_sibling),
            None => self.tree.get(parent).and_then(|n| n.last_child),
        };

        self.bump_tree_version();
        for &node in &nodes {
            self.tree.link_before(parent, node, reference);
        }
        for &node in &nodes {
            self.did_insert_subtree(parent, node);
        }
        self.mark_ancestors_for_style_recalc(parent);

        if let Some(client) = self.client.clone() {
            for &node in &nodes {
                for id in self.tree.inclusive_descendants(node) {
                    client.inserted_into(id, parent);
                }
            }
            client.children_changed(&ChildrenChange {
                kind: ChildrenChangeKind::Inserted,
                parent,
                nodes: nodes.clone(),
                previous_sibling,
                next_sibling: reference,
                by_parser,
            });
        }
        self.notifier.enqueue(
            &self.tree,
            MutationRecord::child_list(parent, nodes, Vec::new(), previous_sibling, reference),
        );
    }

    fn remove_validated(&mut self, parent: NodeId, child: NodeId, record: bool) {
        let subtree: Vec<NodeId> = self.tree.inclusive_descendants(child).collect();
        let (previous_sibling, next_sibling) = self
            .tree
            .get(child)
            .map_or((None, None), |n| (n.prev_sibling, n.next_sibling));

        // Old topology is still visible to everything below
        if let Some(client) = self.client.clone() {
            for &id in &subtree {
                client.node_will_be_removed(id);
            }
        }
        self.notifier.will_detach(&self.tree, child, &subtree);
        if record {
            self.notifier.enqueue(
                &self.tree,
                MutationRecord::child_list(
                    parent,
                    Vec::new(),
                    vec![child],
                    previous_sibling,
                    next_sibling,
                ),
            );
        }

        self.bump_tree_version();
        self.tree.unlink(child);
        self.did_remove_subtree(child);
        self.mark_ancestors_for_style_recalc(parent);

        if let Some(client) = self.client.clone() {
            client.children_changed(&ChildrenChange {
                kind: ChildrenChangeKind::Removed,
                parent,
                nodes: vec![child],
                previous_sibling,
                next_sibling,
                by_parser: false,
            });
        }
        tracing::trace!(%parent, %child, "Child removed");
    }

    /// Scope the children of `parent` belong to
    fn scope_for_children_of(&self, parent: NodeId) -> Option<NodeId> {
        let node = self.tree.get(parent)?;
        if parent == self.root || node.is_shadow_root() {
            Some(parent)
        } else {
            node.tree_scope
        }
    }

    /// Flags, scope and index entries for a freshly linked subtree
    fn did_insert_subtree(&mut self, parent: NodeId, node: NodeId) {
        let scope = self.scope_for_children_of(parent);
        let connected = self.tree.get(parent).is_some_and(Node::is_connected);
        let in_shadow = scope
            .and_then(|s| self.scopes.get(&s))
            .is_some_and(|s| s.kind() == TreeScopeKind::ShadowRoot);

        let subtree: Vec<NodeId> = self.tree.inclusive_descendants(node).collect();
        for &id in &subtree {
            let Some(n) = self.tree.get_mut(id) else { continue };
            n.tree_scope = scope;
            n.flags.set(NodeFlags::IN_DOCUMENT, connected);
            n.flags.set(NodeFlags::IN_SHADOW_TREE, in_shadow);
            if n.is_element() {
                n.flags.set_style_change_type(StyleChangeType::SubtreeStyleChange);
            }
            if let Some(scope) = scope {
                self.add_to_scope_indexes(scope, id);
            }
            if let Some(shadow) = self.tree.get(id).and_then(|n| n.as_element()?.shadow_root) {
                self.set_connected_in_shadow_tree(shadow, connected);
            }
        }
    }

    /// Clear scope flags and index entries of a just-unlinked subtree
    fn did_remove_subtree(&mut self, node: NodeId) {
        let subtree: Vec<NodeId> = self.tree.inclusive_descendants(node).collect();
        for &id in &subtree {
            let scope = self.tree.get(id).and_then(|n| n.tree_scope);
            if let Some(scope) = scope {
                self.remove_from_scope_indexes(scope, id);
            }
            if let Some(n) = self.tree.get_mut(id) {
                n.tree_scope = None;
                n.flags.remove(NodeFlags::IN_TREE_SCOPE);
            }
            if let Some(shadow) = self.tree.get(id).and_then(|n| n.as_element()?.shadow_root) {
                self.set_connected_in_shadow_tree(shadow, false);
            }
        }
    }

    /// Shadow trees keep their scope; only connectedness follows the host
    fn set_connected_in_shadow_tree(&mut self, shadow_root: NodeId, connected: bool) {
        let nodes = self.composed_subtree(shadow_root);
        for id in nodes {
            if let Some(n) = self.tree.get_mut(id) {
                n.flags.set(NodeFlags::IN_DOCUMENT, connected);
            }
        }
    }

    pub(crate) fn add_to_scope_indexes(&mut self, scope: NodeId, element: NodeId) {
        let Some(data) = self.tree.get(element).and_then(Node::as_element) else {
            return;
        };
        let id = data.id.clone();
        let name = data.attrs.get("name").map(str::to_string);
        let Some(scope) = self.scopes.get_mut(&scope) else { return };
        if let Some(id) = id {
            scope.add_element_by_id(&id, element);
        }
        if let Some(name) = name {
            scope.add_element_by_name(&name, element);
        }
    }

    pub(crate) fn remove_from_scope_indexes(&mut self, scope: NodeId, element: NodeId) {
        let Some(data) = self.tree.get(element).and_then(Node::as_element) else {
            return;
        };
        let id = data.id.clone();
        let name = data.attrs.get("name").map(str::to_string);
        let Some(scope) = self.scopes.get_mut(&scope) else { return };
        if let Some(id) = id {
            scope.remove_element_by_id(&id, element);
        }
        if let Some(name) = name {
            scope.remove_element_by_name(&name, element);
        }
    }

    pub(crate) fn mark_ancestors_for_style_recalc(&mut self, from: NodeId) {
        let chain: Vec<NodeId> = std::iter::once(from).chain(self.tree.ancestors(from)).collect();
        for id in chain {
            let Some(n) = self.tree.get_mut(id) else { break };
            if n.flags.contains(NodeFlags::CHILD_NEEDS_STYLE_RECALC) {
                break;
            }
            n.flags.insert(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
        }
    }

    pub(crate) fn set_needs_style_recalc(&mut self, element: NodeId, change: StyleChangeType) {
        let Some(n) = self.tree.get_mut(element) else { return };
        if n.flags.style_change_type() < change {
            n.flags.set_style_change_type(change);
        }
        let parent = n.parent;
        if let Some(parent) = parent {
            self.mark_ancestors_for_style_recalc(parent);
        }
    }

    /// Clear style bits after the style collaborator caught up
    pub fn clear_style_change_flags(&mut self) {
        for id in self.tree.node_ids() {
            if let Some(n) = self.tree.get_mut(id) {
                n.flags.set_style_change_type(StyleChangeType::NoStyleChange);
                n.flags.remove(NodeFlags::CHILD_NEEDS_STYLE_RECALC);
            }
        }
    }

    // ---- Cloning ----

    /// `cloneNode`: never copies wrappers or shadow roots
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        let source = self.node(node)?;
        if matches!(source.data, NodeData::Document) {
            return Err(DomError::NotSupported("a Document cannot be cloned".into()));
        }
        if source.is_shadow_root() {
            return Err(DomError::NotSupported("a shadow root cannot be cloned".into()));
        }
        let copy = self.clone_single(node);
        if !deep {
            return Ok(copy);
        }

        // Pre-order walk; children are pushed reversed so copies keep source order
        let mut pending: Vec<(NodeId, NodeId)> = self
            .tree
            .children(node)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|child| (child, copy))
            .collect();
        while let Some((source, copy_parent)) = pending.pop() {
            let child_copy = self.clone_single(source);
            self.tree.link_before(copy_parent, child_copy, None);
            let start = pending.len();
            pending.extend(self.tree.children(source).map(|child| (child, child_copy)));
            pending[start..].reverse();
        }
        Ok(copy)
    }

    fn clone_single(&mut self, node: NodeId) -> NodeId {
        let sharing = self.engine.features().attribute_sharing;
        let Some(source) = self.tree.get_mut(node) else {
            unreachable!("clone source vanished");
        };
        let mut copy = match &mut source.data {
            NodeData::Element(el) => {
                let mut copy = Node::element(el.local_name.clone());
                if let Some(data) = copy.as_element_mut() {
                    data.attrs = if sharing {
                        AttributeData::from_shared(el.attrs.make_shareable())
                    } else {
                        AttributeData::Unique(el.attrs.as_slice().to_vec())
                    };
                    data.id = el.id.clone();
                    data.classes = el.classes.clone();
                }
                let indexed = NodeFlags::HAS_ID | NodeFlags::HAS_CLASS | NodeFlags::HAS_NAME;
                copy.flags |= source.flags & indexed;
                copy
            }
            NodeData::Text(t) => Node::text(t.clone()),
            NodeData::Comment(t) => Node::comment(t.clone()),
            NodeData::ProcessingInstruction { target, data } => {
                Node::processing_instruction(target.clone(), data.clone())
            }
            NodeData::DocumentType {
                name,
                public_id,
                system_id,
            } => Node::doctype(name.clone(), public_id.clone(), system_id.clone()),
            NodeData::DocumentFragment { .. } => Node::fragment(),
            NodeData::Document => unreachable!("documents are rejected before cloning"),
        };
        copy.flags.insert(NodeFlags::FINISHED_PARSING_CHILDREN);
        self.tree.insert(copy)
    }

    // ---- Character data and text ----

    /// Replace the data of a Text, Comment or ProcessingInstruction node
    pub fn set_character_data(&mut self, node: NodeId, data: &str) -> DomResult<()> {
        let entry = self.node_mut(node)?;
        let Some(current) = entry.character_data_mut() else {
            return Err(DomError::InvalidNodeType("node has no character data".into()));
        };
        let old = std::mem::replace(current, data.to_string());
        let parent = entry.parent;

        if let (Some(client), Some(parent)) = (self.client.clone(), parent) {
            client.children_changed(&ChildrenChange {
                kind: ChildrenChangeKind::TextChanged,
                parent,
                nodes: vec![node],
                previous_sibling: None,
                next_sibling: None,
                by_parser: false,
            });
        }
        if let Some(parent) = parent {
            self.set_needs_style_recalc(parent, StyleChangeType::LocalStyleChange);
        }
        self.notifier
            .enqueue(&self.tree, MutationRecord::character_data(node, old));
        Ok(())
    }

    /// `textContent` getter; `None` for documents and doctypes
    pub fn text_content(&self, node: NodeId) -> Option<String> {
        let n = self.tree.get(node)?;
        match &n.data {
            NodeData::Document | NodeData::DocumentType { .. } => None,
            NodeData::Text(_) | NodeData::Comment(_) | NodeData::ProcessingInstruction { .. } => {
                n.character_data().map(str::to_string)
            }
            NodeData::Element(_) | NodeData::DocumentFragment { .. } => Some(
                self.tree
                    .descendants(node)
                    .filter_map(|id| self.tree.get(id)?.as_text())
                    .collect(),
            ),
        }
    }

    /// `textContent` setter: replaces all children with one text node
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        match self.node(node)?.node_type() {
            NodeType::Document | NodeType::DocumentType => Ok(()),
            NodeType::Text | NodeType::Comment | NodeType::ProcessingInstruction => {
                self.set_character_data(node, text)
            }
            NodeType::Element | NodeType::DocumentFragment => {
                let removed = self.remove_all_children(node);
                let mut added = Vec::new();
                if !text.is_empty() {
                    let child = self.create_text_node(text);
                    self.bump_tree_version();
                    self.tree.link_before(node, child, None);
                    self.did_insert_subtree(node, child);
                    if let Some(client) = self.client.clone() {
                        client.inserted_into(child, node);
                        client.children_changed(&ChildrenChange {
                            kind: ChildrenChangeKind::Inserted,
                            parent: node,
                            nodes: vec![child],
                            previous_sibling: None,
                            next_sibling: None,
                            by_parser: false,
                        });
                    }
                    added.push(child);
                }
                if !removed.is_empty() || !added.is_empty() {
                    self.notifier.enqueue(
                        &self.tree,
                        MutationRecord::child_list(node, added, removed, None, None),
                    );
                }
                self.notify_id_targets();
                Ok(())
            }
        }
    }

    // ---- Shadow roots ----

    /// Attach a shadow root with its own tree scope
    pub fn attach_shadow(&mut self, host: NodeId) -> DomResult<NodeId> {
        if !self.engine.features().shadow_dom {
            return Err(DomError::NotSupported("shadow DOM is disabled".into()));
        }
        let host_node = self.node(host)?;
        let Some(element) = host_node.as_element() else {
            return Err(DomError::NotSupported("only elements can host a shadow root".into()));
        };
        if element.shadow_root.is_some() {
            return Err(DomError::NotSupported("element already hosts a shadow root".into()));
        }
        let connected = host_node.is_connected();

        let mut root = Node::shadow_root(host);
        root.flags.set(NodeFlags::IN_DOCUMENT, connected);
        let shadow = self.tree.insert(root);
        if let Some(n) = self.tree.get_mut(shadow) {
            n.tree_scope = Some(shadow);
        }
        if let Some(el) = self.tree.get_mut(host).and_then(Node::as_element_mut) {
            el.shadow_root = Some(shadow);
        }
        self.scopes
            .insert(shadow, TreeScope::new(shadow, TreeScopeKind::ShadowRoot));
        self.set_needs_style_recalc(host, StyleChangeType::SubtreeStyleChange);
        tracing::trace!(%host, %shadow, "Shadow root attached");
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.tree.get(host)?.as_element()?.shadow_root
    }

    /// Host of a shadow root
    pub fn host(&self, shadow_root: NodeId) -> Option<NodeId> {
        self.tree.get(shadow_root)?.shadow_host()
    }
}
