//! Engine configuration

use arbor_dom::Features;
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DOM feature switches shared by every document
    pub features: Features,
    /// Heap limit per script context, in bytes
    pub script_memory_limit: usize,
    /// Run inline `<script>` elements when a page loads
    pub run_scripts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            features: Features::default(),
            script_memory_limit: arbor_js::DEFAULT_MEMORY_LIMIT,
            run_scripts: true,
        }
    }
}

impl Config {
    /// Minimal configuration: no scripts, no attribute sharing
    pub fn minimal() -> Self {
        Self {
            features: Features {
                attribute_sharing: false,
                ..Features::default()
            },
            run_scripts: false,
            ..Self::default()
        }
    }
}
