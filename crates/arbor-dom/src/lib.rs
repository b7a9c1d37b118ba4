//! Arbor DOM - Document Object Model
//!
//! Arena-backed document tree with copy-on-write attribute storage,
//! per-scope id/name indexes, mutation observers and the binding table
//! that ties nodes to script wrappers.
//!
//! All state is single-threaded: a [`Document`] is `!Send` and every
//! collaborator is expected to call in from the thread that owns it.

mod arena;
mod attributes;
mod binding;
mod capability;
mod client;
mod collections;
mod document;
mod element;
mod engine;
mod error;
mod flags;
mod mutate;
mod mutation;
mod node;
mod security;
mod tree;
mod tree_scope;

pub use arena::NodeArena;
pub use attributes::{Attribute, AttributeData, ElementDataCache, ShareableAttributes};
pub use binding::WrapperId;
pub use capability::{
    AttributeHolder, Capabilities, EventTarget, NodeRef, TreeScopeMember, Traversable,
};
pub use client::{
    ChildrenChange, ChildrenChangeKind, DocumentClient, HostErrorChannel, Milestone,
    TracingErrorChannel, WrapperClient,
};
pub use collections::CollectionKind;
pub use document::{
    Document, DocumentInit, DocumentParser, ParserFactory, ParsingState, ReadyState,
    MAX_WRITE_RECURSION_DEPTH,
};
pub use element::is_valid_name;
pub use engine::{EngineState, Features};
pub use error::{CallbackError, DomError, DomResult};
pub use flags::{NodeFlags, StyleChangeType};
pub use mutation::{
    MutationCallback, MutationNotifier, MutationObserverInit, MutationRecord, MutationType,
    ObserverId, RegistrationState,
};
pub use node::{ElementData, Node, NodeData, NodeType};
pub use security::{CookieJar, MemoryCookieJar, SecurityOrigin};
pub use tree::DomTree;
pub use tree_scope::{IdTargetObserver, TreeScope, TreeScopeKind};

use std::fmt;

/// Node identifier (index into the arena plus the slot generation)
///
/// A freed slot bumps its generation, so an id that outlives its node stops
/// resolving instead of aliasing whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot
    pub fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at allocation time
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
