//! Engine entry point

use std::rc::Rc;

use anyhow::Context as _;
use arbor_dom::{Document, DocumentInit, EngineState};
use arbor_html::HtmlParser;

use crate::{Config, Page};

/// Owns the shared engine state and creates pages
#[derive(Debug)]
pub struct Engine {
    config: Config,
    state: Rc<EngineState>,
}

impl Engine {
    /// Create a new engine
    pub fn new(config: Config) -> Self {
        tracing::info!(
            version = crate::VERSION,
            run_scripts = config.run_scripts,
            "Initializing Arbor engine"
        );
        let state = Rc::new(EngineState::new(config.features.clone()));
        Self { config, state }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &Rc<EngineState> {
        &self.state
    }

    /// Parse `html` as the document at `url` and run its inline scripts
    pub fn load_html(&self, url: &str, html: &str) -> anyhow::Result<Page> {
        self.load_with_init(html, DocumentInit::new().with_url(url))
    }

    /// Load with explicit document parameters (cookie jar, clients...)
    pub fn load_with_init(&self, html: &str, init: DocumentInit) -> anyhow::Result<Page> {
        let document = HtmlParser::new(self.state.clone())
            .parse_with_init(html, init)
            .context("failed to parse page")?;
        tracing::debug!(url = %document.url(), nodes = document.node_count(), "Page parsed");
        Page::new(document, &self.config)
    }

    /// `about:blank` with the html/head/body skeleton
    pub fn blank_page(&self) -> anyhow::Result<Page> {
        let document = Document::new(self.state.clone(), arbor_html::html_document_init());
        Page::new(document, &self.config)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
