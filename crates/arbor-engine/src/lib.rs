//! Arbor Engine
//!
//! Headless document engine: an HTML-parsed document tree that embedded
//! scripts inspect, mutate and observe.
//!
//! # Example
//! ```rust,ignore
//! use arbor_engine::{Config, Engine};
//!
//! arbor_engine::init_tracing();
//! let engine = Engine::new(Config::default());
//! let page = engine.load_html("https://example.com/", "<p id=x>hi</p>")?;
//! page.eval("document.getElementById('x').textContent")?;
//! ```

mod config;
mod engine;
mod page;

pub use config::Config;
pub use engine::Engine;
pub use page::Page;

// Re-export sub-crates for advanced usage
pub use arbor_dom as dom;
pub use arbor_html as html;
pub use arbor_js as js;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`)
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}
