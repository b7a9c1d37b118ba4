//! Outbound collaborator interfaces
//!
//! Clients receive plain ids and strings, never the document, so they
//! cannot re-enter tree mutation from inside a notification.

use crate::binding::WrapperId;
use crate::error::CallbackError;
use crate::NodeId;

/// Document lifecycle milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    DomContentLoaded,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildrenChangeKind {
    Inserted,
    Removed,
    TextChanged,
}

/// Descriptor passed with `children_changed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildrenChange {
    pub kind: ChildrenChangeKind,
    pub parent: NodeId,
    pub nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub by_parser: bool,
}

/// Style/layout side of the engine
///
/// All methods are called synchronously while the mutation is in progress.
#[allow(unused_variables)]
pub trait DocumentClient {
    /// Called for each node of a subtree in pre-order, before unlinking
    fn node_will_be_removed(&self, node: NodeId) {}

    /// Called for each node of a subtree after it was linked under `parent`
    fn inserted_into(&self, node: NodeId, parent: NodeId) {}

    fn children_changed(&self, change: &ChildrenChange) {}

    fn attribute_changed_for_element(&self, element: NodeId, name: &str) {}

    fn id_changed_for_element(&self, element: NodeId, old: Option<&str>, new: Option<&str>) {}

    fn class_changed_for_element(&self, element: NodeId, old: &[String], new: &[String]) {}

    fn milestone(&self, milestone: Milestone) {}
}

/// Script runtime memory manager
pub trait WrapperClient {
    /// Called after the binding is recorded
    fn register_wrapper(&self, node: NodeId, handle: WrapperId);

    /// The node behind `handle` is gone
    fn invalidate_wrapper(&self, handle: WrapperId);
}

/// Where observer callback failures go
pub trait HostErrorChannel {
    fn report_error(&self, error: &CallbackError);
}

/// Default channel: log and continue
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorChannel;

impl HostErrorChannel for TracingErrorChannel {
    fn report_error(&self, error: &CallbackError) {
        tracing::error!(error = %error, "Uncaught error in mutation observer callback");
    }
}
