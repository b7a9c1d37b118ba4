//! Element attributes
//!
//! Attribute API on top of [`AttributeData`]. Every change funnels through
//! `attribute_changed`, which runs the internal reactions in a fixed order:
//! generic client notification, then the `id`/`class`/`name`
//! specializations (index and class-list upkeep), then the external
//! observer record. Id-target observers run only after the operation.

use crate::attributes::{Attribute, AttributeData};
use crate::document::Document;
use crate::error::{DomError, DomResult};
use crate::flags::{NodeFlags, StyleChangeType};
use crate::mutation::MutationRecord;
use crate::node::Node;
use crate::NodeId;

/// XML `Name` production (element names, attribute names, PI targets)
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_ascii_alphabetic() || first == '_' || first == ':' || !first.is_ascii();
    start_ok
        && chars.all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':') || !c.is_ascii()
        })
}

/// Whitespace-split class list without duplicates
fn split_classes(value: &str) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    for class in value.split_ascii_whitespace() {
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }
    classes
}

impl Document {
    fn element_checked(&self, element: NodeId) -> DomResult<&Node> {
        let node = self.node(element)?;
        if !node.is_element() {
            return Err(DomError::InvalidNodeType("node is not an element".into()));
        }
        Ok(node)
    }

    fn validated_attribute_name(name: &str) -> DomResult<String> {
        if !is_valid_name(name) {
            return Err(DomError::InvalidCharacter(format!(
                "'{name}' is not a valid attribute name"
            )));
        }
        Ok(name.to_ascii_lowercase())
    }

    /// Read-only lookup; never uniquifies shared storage
    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        let data = self.tree.get(element)?.as_element()?;
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            data.attrs.get(&name.to_ascii_lowercase())
        } else {
            data.attrs.get(name)
        }
    }

    pub fn has_attribute(&self, element: NodeId, name: &str) -> bool {
        self.get_attribute(element, name).is_some()
    }

    pub fn attribute_names(&self, element: NodeId) -> Vec<String> {
        self.tree
            .get(element)
            .and_then(Node::as_element)
            .map(|e| e.attrs.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn attributes(&self, element: NodeId) -> Option<&AttributeData> {
        Some(self.tree.get(element)?.as_element()?.attributes())
    }

    /// `setAttribute`: append when absent, update in place when the value
    /// differs, nothing at all when it is unchanged
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.element_checked(element)?;
        let name = Self::validated_attribute_name(name)?;

        let Some(data) = self.tree.get_mut(element).and_then(Node::as_element_mut) else {
            return Err(DomError::InvalidNodeType("node is not an element".into()));
        };
        let old = match data.attrs.find_index(&name) {
            None => {
                data.attrs.ensure_unique().push(Attribute::new(name.clone(), value));
                None
            }
            Some(index) => {
                if data.attrs.as_slice()[index].value == value {
                    return Ok(());
                }
                let slot = &mut data.attrs.ensure_unique()[index].value;
                Some(std::mem::replace(slot, value.to_string()))
            }
        };

        self.attribute_changed(element, &name, old.as_deref(), Some(value), true);
        self.notify_id_targets();
        Ok(())
    }

    /// `removeAttribute`: silent no-op when absent
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> DomResult<()> {
        self.element_checked(element)?;
        let name = name.to_ascii_lowercase();

        let Some(data) = self.tree.get_mut(element).and_then(Node::as_element_mut) else {
            return Ok(());
        };
        let Some(index) = data.attrs.find_index(&name) else {
            return Ok(());
        };
        let removed = data.attrs.ensure_unique().remove(index);

        self.attribute_changed(element, &name, Some(&removed.value), None, true);
        self.notify_id_targets();
        Ok(())
    }

    /// `toggleAttribute`, returns whether the attribute is now present
    pub fn toggle_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        force: Option<bool>,
    ) -> DomResult<bool> {
        self.element_checked(element)?;
        let name = Self::validated_attribute_name(name)?;
        let present = self.has_attribute(element, &name);
        match (present, force) {
            (true, Some(true)) => Ok(true),
            (false, Some(false)) => Ok(false),
            (true, _) => {
                self.remove_attribute(element, &name)?;
                Ok(false)
            }
            (false, _) => {
                self.set_attribute(element, &name, "")?;
                Ok(true)
            }
        }
    }

    /// Initial attributes of a parser-created element
    ///
    /// Duplicates keep the first occurrence. With attribute sharing on, the
    /// block comes from the document's content-keyed cache. Internal
    /// reactions run; no observer records are queued.
    pub fn parser_set_attributes(&mut self, element: NodeId, attrs: Vec<Attribute>) {
        let mut unique: Vec<Attribute> = Vec::with_capacity(attrs.len());
        for attr in attrs {
            let name = attr.name.to_ascii_lowercase();
            if !unique.iter().any(|a| a.name == name) {
                unique.push(Attribute::new(name, attr.value));
            }
        }
        if unique.is_empty() {
            return;
        }

        let storage = if self.engine.features().attribute_sharing {
            AttributeData::from_shared(self.element_data_cache.cached_shareable(unique))
        } else {
            AttributeData::Unique(unique)
        };
        let Some(data) = self.tree.get_mut(element).and_then(Node::as_element_mut) else {
            return;
        };
        data.attrs = storage;
        let applied: Vec<Attribute> = data.attrs.as_slice().to_vec();
        for attr in &applied {
            self.attribute_changed(element, &attr.name, None, Some(&attr.value), false);
        }
    }

    /// Internal fan-out for one attribute change
    fn attribute_changed(
        &mut self,
        element: NodeId,
        name: &str,
        old: Option<&str>,
        new: Option<&str>,
        direct: bool,
    ) {
        if let Some(client) = &self.client {
            client.attribute_changed_for_element(element, name);
        }

        match name {
            "id" => self.id_attribute_changed(element, old, new),
            "class" => self.class_attribute_changed(element, new),
            "name" => self.name_attribute_changed(element, old, new),
            _ => {}
        }

        if direct {
            self.notifier.enqueue(
                &self.tree,
                MutationRecord::attributes(element, name, old.map(str::to_string)),
            );
        }
        self.set_needs_style_recalc(element, StyleChangeType::LocalStyleChange);
        tracing::trace!(%element, name, "Attribute changed");
    }

    fn id_attribute_changed(&mut self, element: NodeId, old: Option<&str>, new: Option<&str>) {
        let Some(node) = self.tree.get_mut(element) else { return };
        let scope = node.tree_scope;
        node.flags.set(NodeFlags::HAS_ID, new.is_some());
        if let Some(data) = node.as_element_mut() {
            data.id = new.map(str::to_string);
        }

        if let Some(scope) = scope.and_then(|s| self.scopes.get_mut(&s)) {
            if let Some(old) = old {
                scope.remove_element_by_id(old, element);
            }
            if let Some(new) = new {
                scope.add_element_by_id(new, element);
            }
        }
        if let Some(client) = &self.client {
            client.id_changed_for_element(element, old, new);
        }
    }

    fn class_attribute_changed(&mut self, element: NodeId, new: Option<&str>) {
        let classes = new.map(split_classes).unwrap_or_default();
        let Some(node) = self.tree.get_mut(element) else { return };
        node.flags.set(NodeFlags::HAS_CLASS, !classes.is_empty());
        let Some(data) = node.as_element_mut() else { return };
        let old_classes = std::mem::replace(&mut data.classes, classes);

        self.collections.invalidate_class_collections();
        if let Some(client) = &self.client {
            let new_classes = self
                .tree
                .get(element)
                .and_then(Node::as_element)
                .map(|e| e.classes.as_slice())
                .unwrap_or_default();
            client.class_changed_for_element(element, &old_classes, new_classes);
        }
    }

    fn name_attribute_changed(&mut self, element: NodeId, old: Option<&str>, new: Option<&str>) {
        let Some(node) = self.tree.get_mut(element) else { return };
        node.flags.set(NodeFlags::HAS_NAME, new.is_some());
        let scope = node.tree_scope;

        if let Some(scope) = scope.and_then(|s| self.scopes.get_mut(&s)) {
            if let Some(old) = old {
                scope.remove_element_by_name(old, element);
            }
            if let Some(new) = new {
                scope.add_element_by_name(new, element);
            }
        }
        self.collections.invalidate_name_collections();
    }

    // ---- Cached per-element state ----

    pub fn element_id(&self, element: NodeId) -> Option<&str> {
        self.tree.get(element)?.as_element()?.id()
    }

    pub fn class_list(&self, element: NodeId) -> Vec<String> {
        self.tree
            .get(element)
            .and_then(Node::as_element)
            .map(|e| e.classes.clone())
            .unwrap_or_default()
    }

    pub fn has_class(&self, element: NodeId, class: &str) -> bool {
        self.tree
            .get(element)
            .and_then(Node::as_element)
            .is_some_and(|e| e.has_class(class))
    }

    /// Upper-cased tag name
    pub fn tag_name(&self, element: NodeId) -> Option<String> {
        Some(self.tree.get(element)?.as_element()?.local_name().to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DocumentClient;
    use crate::document::DocumentInit;
    use crate::engine::{EngineState, Features};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn doc() -> Document {
        Document::new(Rc::new(EngineState::default()), DocumentInit::new())
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("div"));
        assert!(is_valid_name("data-x.y_z:w"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("ünï"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1abc"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("a<b"));
    }

    #[test]
    fn test_set_get_attribute() {
        let mut doc = doc();
        let el = doc.create_element("button").unwrap();
        doc.set_attribute(el, "CLASS", "btn").unwrap();
        doc.set_attribute(el, "id", "submit").unwrap();

        assert_eq!(doc.get_attribute(el, "class"), Some("btn"));
        assert_eq!(doc.get_attribute(el, "Class"), Some("btn"));
        assert_eq!(doc.attribute_names(el), vec!["class", "id"]);
        assert_eq!(doc.element_id(el), Some("submit"));
        assert!(matches!(
            doc.set_attribute(el, "bad name", "x"),
            Err(DomError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn test_remove_attribute_absent_is_noop() {
        let mut doc = doc();
        let el = doc.create_element("div").unwrap();
        doc.remove_attribute(el, "missing").unwrap();
        doc.set_attribute(el, "foo", "bar").unwrap();
        doc.remove_attribute(el, "foo").unwrap();
        assert!(!doc.has_attribute(el, "foo"));
    }

    #[test]
    fn test_toggle_attribute() {
        let mut doc = doc();
        let el = doc.create_element("input").unwrap();

        assert!(doc.toggle_attribute(el, "disabled", None).unwrap());
        assert!(doc.has_attribute(el, "disabled"));
        assert!(!doc.toggle_attribute(el, "disabled", None).unwrap());
        assert!(doc.toggle_attribute(el, "disabled", Some(true)).unwrap());
        assert!(doc.toggle_attribute(el, "disabled", Some(true)).unwrap());
        assert!(!doc.toggle_attribute(el, "disabled", Some(false)).unwrap());
        assert!(!doc.has_attribute(el, "disabled"));
    }

    #[test]
    fn test_attribute_on_non_element() {
        let mut doc = doc();
        let text = doc.create_text_node("x");
        assert!(matches!(
            doc.set_attribute(text, "a", "b"),
            Err(DomError::InvalidNodeType(_))
        ));
        assert_eq!(doc.get_attribute(text, "a"), None);
    }

    #[test]
    fn test_class_list_recomputed() {
        let mut doc = doc();
        let el = doc.create_element("div").unwrap();
        doc.set_attribute(el, "class", "  a b  a\tc ").unwrap();
        assert_eq!(doc.class_list(el), vec!["a", "b", "c"]);
        assert!(doc.get(el).unwrap().flags().contains(NodeFlags::HAS_CLASS));

        doc.remove_attribute(el, "class").unwrap();
        assert!(doc.class_list(el).is_empty());
        assert!(!doc.get(el).unwrap().flags().contains(NodeFlags::HAS_CLASS));
    }

    #[test]
    fn test_parser_attributes_share_cached_blocks() {
        let mut doc = doc();
        let attrs = || vec![Attribute::new("type", "text"), Attribute::new("TYPE", "dup")];
        let a = doc.create_element_for_parser("input", attrs());
        let b = doc.create_element_for_parser("input", attrs());

        let (da, db) = (doc.attributes(a).unwrap(), doc.attributes(b).unwrap());
        assert!(da.shares_storage_with(db));
        assert_eq!(da.len(), 1);
        assert_eq!(doc.get_attribute(a, "type"), Some("text"));

        // Unchanged value keeps the shared block
        doc.set_attribute(a, "type", "text").unwrap();
        assert!(!doc.attributes(a).unwrap().is_unique());

        doc.set_attribute(a, "type", "search").unwrap();
        assert!(doc.attributes(a).unwrap().is_unique());
        assert_eq!(doc.get_attribute(b, "type"), Some("text"));
    }

    #[test]
    fn test_parser_attributes_without_sharing() {
        let features = Features {
            attribute_sharing: false,
            ..Features::default()
        };
        let mut doc = Document::new(Rc::new(EngineState::new(features)), DocumentInit::new());
        let a = doc.create_element_for_parser("p", vec![Attribute::new("id", "x")]);
        assert!(doc.attributes(a).unwrap().is_unique());
        assert_eq!(doc.element_id(a), Some("x"));
    }

    #[derive(Default)]
    struct Calls(RefCell<Vec<String>>);

    impl DocumentClient for Calls {
        fn attribute_changed_for_element(&self, _element: NodeId, name: &str) {
            self.0.borrow_mut().push(format!("attr {name}"));
        }
        fn id_changed_for_element(&self, _element: NodeId, old: Option<&str>, new: Option<&str>) {
            self.0.borrow_mut().push(format!("id {old:?} -> {new:?}"));
        }
        fn class_changed_for_element(&self, _element: NodeId, old: &[String], new: &[String]) {
            self.0.borrow_mut().push(format!("class {old:?} -> {new:?}"));
        }
    }

    #[test]
    fn test_generic_notification_precedes_specialization() {
        let calls = Rc::new(Calls::default());
        let mut doc = Document::new(
            Rc::new(EngineState::default()),
            DocumentInit::new().with_client(calls.clone()),
        );
        let el = doc.create_element("div").unwrap();
        doc.set_attribute(el, "id", "a").unwrap();
        doc.set_attribute(el, "id", "a").unwrap();
        doc.set_attribute(el, "class", "x").unwrap();

        assert_eq!(
            *calls.0.borrow(),
            vec![
                "attr id".to_string(),
                "id None -> Some(\"a\")".to_string(),
                "attr class".to_string(),
                "class [] -> [\"x\"]".to_string(),
            ]
        );
    }
}
