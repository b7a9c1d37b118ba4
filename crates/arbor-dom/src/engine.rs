//! Process-wide engine state
//!
//! Created once by the embedder and shared by every document through an
//! `Rc`. Dropping the last handle tears it down.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// Feature switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Share identical attribute blocks between parser-created elements
    pub attribute_sharing: bool,
    /// Upper bound on cached attribute blocks per document
    pub element_data_cache_capacity: usize,
    /// Allow `document.open/write/close`
    pub document_write: bool,
    pub shadow_dom: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            attribute_sharing: true,
            element_data_cache_capacity: 1024,
            document_write: true,
            shadow_dom: true,
        }
    }
}

/// Global counters and static feature flags
#[derive(Debug, Default)]
pub struct EngineState {
    global_tree_version: Cell<u64>,
    next_document_id: Cell<u64>,
    features: Features,
}

impl EngineState {
    pub fn new(features: Features) -> Self {
        tracing::debug!(?features, "Engine state initialized");
        Self {
            global_tree_version: Cell::new(0),
            next_document_id: Cell::new(1),
            features,
        }
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Monotonic across all documents of this engine
    pub fn global_tree_version(&self) -> u64 {
        self.global_tree_version.get()
    }

    pub(crate) fn bump_global_tree_version(&self) -> u64 {
        let next = self.global_tree_version.get() + 1;
        self.global_tree_version.set(next);
        next
    }

    pub(crate) fn allocate_document_id(&self) -> u64 {
        let id = self.next_document_id.get().max(1);
        self.next_document_id.set(id + 1);
        id
    }
}
