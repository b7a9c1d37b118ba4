//! Mutation observers
//!
//! Registrations hang off nodes; records are queued per observer and handed
//! out at the next delivery checkpoint (`Document::deliver_mutation_records`).
//! Removing a subtree gives subtree observers of the former ancestors a
//! transient registration on the removed root and queues one
//! `NodeWillDetach` record per (observer, registered node) inside it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use crate::document::Document;
use crate::error::{CallbackError, DomError, DomResult};
use crate::tree::DomTree;
use crate::NodeId;

/// Observer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Rebuild an id handed out through [`ObserverId::as_u64`]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Mutation observer options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Apply the implied flags and reject option sets that observe nothing
    pub fn validate(mut self) -> DomResult<Self> {
        if self.attribute_old_value || self.attribute_filter.is_some() {
            self.attributes = true;
        }
        if self.character_data_old_value {
            self.character_data = true;
        }
        if !self.child_list && !self.attributes && !self.character_data {
            return Err(DomError::Type(
                "options must set at least one of 'attributes', 'characterData' or 'childList'"
                    .into(),
            ));
        }
        Ok(self)
    }

    fn wants(&self, kind: MutationType, attribute_name: Option<&str>) -> bool {
        match kind {
            MutationType::ChildList => self.child_list,
            MutationType::CharacterData => self.character_data,
            MutationType::Attributes => {
                self.attributes
                    && match (&self.attribute_filter, attribute_name) {
                        (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                        _ => true,
                    }
            }
            MutationType::NodeWillDetach => true,
        }
    }

    fn wants_old_value(&self, kind: MutationType) -> bool {
        match kind {
            MutationType::Attributes => self.attribute_old_value,
            MutationType::CharacterData => self.character_data_old_value,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
    /// The registered node is being removed from its tree
    NodeWillDetach,
}

impl MutationType {
    /// Record `type` string as scripts see it
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attributes => "attributes",
            Self::CharacterData => "characterData",
            Self::ChildList => "childList",
            Self::NodeWillDetach => "nodeWillDetach",
        }
    }
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub attribute_namespace: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    fn new(mutation_type: MutationType, target: NodeId) -> Self {
        Self {
            mutation_type,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            attribute_namespace: None,
            old_value: None,
        }
    }

    pub fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            ..Self::new(MutationType::ChildList, target)
        }
    }

    pub fn attributes(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            attribute_name: Some(name.to_string()),
            old_value,
            ..Self::new(MutationType::Attributes, target)
        }
    }

    pub fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            old_value: Some(old_value),
            ..Self::new(MutationType::CharacterData, target)
        }
    }

    pub fn node_will_detach(target: NodeId) -> Self {
        Self::new(MutationType::NodeWillDetach, target)
    }

    /// Every node this record keeps reachable
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.target)
            .chain(self.added_nodes.iter().copied())
            .chain(self.removed_nodes.iter().copied())
            .chain(self.previous_sibling)
            .chain(self.next_sibling)
    }
}

/// Native observer callback
///
/// Runs at the delivery checkpoint with full access to the document, so it
/// may mutate the tree; records caused by that are delivered in a later
/// round of the same checkpoint.
pub trait MutationCallback {
    fn call(
        &self,
        records: &[MutationRecord],
        document: &mut Document,
    ) -> Result<(), CallbackError>;
}

impl<F> MutationCallback for F
where
    F: Fn(&[MutationRecord], &mut Document) -> Result<(), CallbackError>,
{
    fn call(
        &self,
        records: &[MutationRecord],
        document: &mut Document,
    ) -> Result<(), CallbackError> {
        self(records, document)
    }
}

/// Observation state of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
    /// Only transient registrations remain
    Transient,
}

#[derive(Debug, Clone)]
struct Registration {
    observer: ObserverId,
    options: MutationObserverInit,
    /// Ancestor the registration was copied from, `None` for direct ones
    transient_source: Option<NodeId>,
}

struct Observer {
    callback: Option<Rc<dyn MutationCallback>>,
    records: Vec<MutationRecord>,
    /// Nodes holding a registration of this observer
    nodes: HashSet<NodeId>,
    /// Nodes with a queued `NodeWillDetach` record
    pending_detach: HashSet<NodeId>,
}

/// Registry of observers and their registrations
#[derive(Default)]
pub struct MutationNotifier {
    next_id: u64,
    observers: BTreeMap<ObserverId, Observer>,
    registrations: HashMap<NodeId, Vec<Registration>>,
}

impl std::fmt::Debug for MutationNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationNotifier")
            .field("observers", &self.observers.len())
            .field("registered_nodes", &self.registrations.len())
            .finish()
    }
}

impl MutationNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observers without a native callback are drained by the embedder
    pub fn create_observer(&mut self, callback: Option<Rc<dyn MutationCallback>>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.insert(
            id,
            Observer {
                callback,
                records: Vec::new(),
                nodes: HashSet::new(),
                pending_detach: HashSet::new(),
            },
        );
        tracing::trace!(observer = id.0, "Mutation observer created");
        id
    }

    pub fn contains_observer(&self, observer: ObserverId) -> bool {
        self.observers.contains_key(&observer)
    }

    pub fn callback(&self, observer: ObserverId) -> Option<Rc<dyn MutationCallback>> {
        self.observers.get(&observer)?.callback.clone()
    }

    /// Register (or re-register with new options) `observer` on `target`
    pub fn observe(
        &mut self,
        observer: ObserverId,
        target: NodeId,
        options: MutationObserverInit,
    ) -> DomResult<()> {
        let options = options.validate()?;
        if !self.observers.contains_key(&observer) {
            return Err(DomError::invalid_state("mutation observer was removed"));
        }

        // Re-observing drops transients copied from this target
        self.drop_transients(observer, |r| r.transient_source == Some(target));

        let list = self.registrations.entry(target).or_default();
        match list
            .iter_mut()
            .find(|r| r.observer == observer && r.transient_source.is_none())
        {
            Some(existing) => existing.options = options,
            None => list.push(Registration {
                observer,
                options,
                transient_source: None,
            }),
        }
        if let Some(obs) = self.observers.get_mut(&observer) {
            obs.nodes.insert(target);
        }
        Ok(())
    }

    /// Remove every registration of `observer` and discard its queue
    pub fn disconnect(&mut self, observer: ObserverId) {
        let Some(obs) = self.observers.get_mut(&observer) else {
            return;
        };
        let nodes: Vec<NodeId> = obs.nodes.drain().collect();
        obs.records.clear();
        obs.pending_detach.clear();
        for node in nodes {
            self.remove_registrations(node, |r| r.observer == observer);
        }
    }

    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        match self.observers.get_mut(&observer) {
            Some(obs) => {
                obs.pending_detach.clear();
                std::mem::take(&mut obs.records)
            }
            None => Vec::new(),
        }
    }

    pub fn remove_observer(&mut self, observer: ObserverId) {
        self.disconnect(observer);
        self.observers.remove(&observer);
    }

    pub fn registration_state(&self, node: NodeId) -> RegistrationState {
        match self.registrations.get(&node) {
            None => RegistrationState::Unregistered,
            Some(list) if list.iter().any(|r| r.transient_source.is_none()) => {
                RegistrationState::Registered
            }
            Some(_) => RegistrationState::Transient,
        }
    }

    /// Observers that want a record of `kind` for `target`, with whether each
    /// wants the old value
    pub fn interested_observers(
        &self,
        tree: &DomTree,
        target: NodeId,
        kind: MutationType,
        attribute_name: Option<&str>,
    ) -> Vec<(ObserverId, bool)> {
        let mut interested: Vec<(ObserverId, bool)> = Vec::new();
        if self.registrations.is_empty() {
            return interested;
        }
        let chain = std::iter::once(target).chain(tree.ancestors(target));
        for node in chain {
            let Some(list) = self.registrations.get(&node) else {
                continue;
            };
            for reg in list {
                if node != target && !reg.options.subtree {
                    continue;
                }
                if !reg.options.wants(kind, attribute_name) {
                    continue;
                }
                let old = reg.options.wants_old_value(kind);
                match interested.iter_mut().find(|(id, _)| *id == reg.observer) {
                    Some(entry) => entry.1 |= old,
                    None => interested.push((reg.observer, old)),
                }
            }
        }
        interested
    }

    /// Queue `record` for every interested observer
    pub fn enqueue(&mut self, tree: &DomTree, record: MutationRecord) {
        let interested = self.interested_observers(
            tree,
            record.target,
            record.mutation_type,
            record.attribute_name.as_deref(),
        );
        for (observer, wants_old) in interested {
            let Some(obs) = self.observers.get_mut(&observer) else {
                continue;
            };
            let mut copy = record.clone();
            if !wants_old {
                copy.old_value = None;
            }
            obs.records.push(copy);
        }
    }

    /// Bookkeeping before `removed_root` is unlinked
    ///
    /// `subtree` is the inclusive pre-order subtree of `removed_root`, which
    /// must still be linked under its old parent.
    pub fn will_detach(&mut self, tree: &DomTree, removed_root: NodeId, subtree: &[NodeId]) {
        if self.registrations.is_empty() {
            return;
        }

        let mut transients: Vec<Registration> = Vec::new();
        for ancestor in tree.ancestors(removed_root) {
            let Some(list) = self.registrations.get(&ancestor) else {
                continue;
            };
            for reg in list.iter().filter(|r| r.options.subtree) {
                transients.push(Registration {
                    observer: reg.observer,
                    options: reg.options.clone(),
                    transient_source: Some(ancestor),
                });
            }
        }
        for reg in transients {
            let list = self.registrations.entry(removed_root).or_default();
            let duplicate = list.iter().any(|r| {
                r.observer == reg.observer && r.transient_source == reg.transient_source
            });
            if duplicate {
                continue;
            }
            if let Some(obs) = self.observers.get_mut(&reg.observer) {
                obs.nodes.insert(removed_root);
            }
            tracing::trace!(
                observer = reg.observer.0,
                node = %removed_root,
                "Transient registration added"
            );
            list.push(reg);
        }

        for &node in subtree {
            let Some(list) = self.registrations.get(&node) else {
                continue;
            };
            let direct: Vec<ObserverId> = list
                .iter()
                .filter(|r| r.transient_source.is_none())
                .map(|r| r.observer)
                .collect();
            for observer in direct {
                let Some(obs) = self.observers.get_mut(&observer) else {
                    continue;
                };
                if obs.pending_detach.insert(node) {
                    obs.records.push(MutationRecord::node_will_detach(node));
                }
            }
        }
    }

    /// Drain every non-empty queue in observer creation order
    ///
    /// Transient registrations of the drained observers end here.
    pub fn take_pending(&mut self) -> Vec<(ObserverId, Vec<MutationRecord>)> {
        let mut batch = Vec::new();
        for (id, obs) in self.observers.iter_mut() {
            if obs.records.is_empty() {
                continue;
            }
            obs.pending_detach.clear();
            batch.push((*id, std::mem::take(&mut obs.records)));
        }
        for (observer, _) in &batch {
            let observer = *observer;
            self.drop_transients(observer, |r| r.transient_source.is_some());
        }
        batch
    }

    pub fn has_pending(&self) -> bool {
        self.observers.values().any(|o| !o.records.is_empty())
    }

    /// Nodes referenced from queued records
    pub fn referenced_nodes(&self) -> Vec<NodeId> {
        self.observers
            .values()
            .flat_map(|o| o.records.iter().flat_map(MutationRecord::nodes))
            .collect()
    }

    /// Drop every registration on a destroyed node
    pub fn forget_node(&mut self, node: NodeId) {
        let Some(list) = self.registrations.remove(&node) else {
            return;
        };
        for reg in list {
            if let Some(obs) = self.observers.get_mut(&reg.observer) {
                obs.nodes.remove(&node);
                obs.pending_detach.remove(&node);
            }
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn drop_transients(&mut self, observer: ObserverId, matches: impl Fn(&Registration) -> bool) {
        let Some(obs) = self.observers.get(&observer) else {
            return;
        };
        let nodes: Vec<NodeId> = obs.nodes.iter().copied().collect();
        for node in nodes {
            self.remove_registrations(node, |r| {
                r.observer == observer && r.transient_source.is_some() && matches(r)
            });
            let still_registered = self
                .registrations
                .get(&node)
                .is_some_and(|list| list.iter().any(|r| r.observer == observer));
            if !still_registered {
                if let Some(obs) = self.observers.get_mut(&observer) {
                    obs.nodes.remove(&node);
                }
            }
        }
    }

    fn remove_registrations(&mut self, node: NodeId, matches: impl Fn(&Registration) -> bool) {
        if let Some(list) = self.registrations.get_mut(&node) {
            list.retain(|r| !matches(r));
            if list.is_empty() {
                self.registrations.remove(&node);
            }
        }
    }
}
