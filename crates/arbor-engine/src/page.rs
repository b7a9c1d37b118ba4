//! Page Representation
//!
//! A loaded document plus, when scripting is enabled, the script context
//! bound to it.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use anyhow::Context as _;
use arbor_dom::{Document, NodeId};
use arbor_js::{JsValue, ScriptContext};

use crate::Config;

/// A loaded page
pub struct Page {
    document: Rc<RefCell<Document>>,
    scripts: Option<ScriptContext>,
    /// Inline scripts run at load, failures included
    scripts_executed: usize,
    script_errors: usize,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url())
            .field("has_script_context", &self.scripts.is_some())
            .field("scripts_executed", &self.scripts_executed)
            .field("script_errors", &self.script_errors)
            .finish()
    }
}

impl Page {
    pub(crate) fn new(document: Document, config: &Config) -> anyhow::Result<Self> {
        let document = Rc::new(RefCell::new(document));
        let scripts = if config.run_scripts {
            let context =
                ScriptContext::with_memory_limit(document.clone(), config.script_memory_limit)
                    .context("failed to create script context")?;
            Some(context)
        } else {
            None
        };

        let mut page = Self {
            document,
            scripts,
            scripts_executed: 0,
            script_errors: 0,
        };
        page.execute_inline_scripts();
        Ok(page)
    }

    /// Run classic inline scripts in tree order
    ///
    /// A failing script is logged and does not stop the ones after it.
    fn execute_inline_scripts(&mut self) {
        let Some(scripts) = &self.scripts else {
            return;
        };
        let sources: Vec<String> = {
            let doc = self.document.borrow();
            inline_scripts(&doc)
                .into_iter()
                .filter_map(|id| doc.text_content(id))
                .collect()
        };

        for (index, source) in sources.iter().enumerate() {
            self.scripts_executed += 1;
            if let Err(err) = scripts.exec(source) {
                self.script_errors += 1;
                tracing::warn!(index, error = %err, "Inline script failed");
            }
        }
        if !sources.is_empty() {
            tracing::info!(
                url = %self.url(),
                count = sources.len(),
                errors = self.script_errors,
                "Inline scripts executed"
            );
        }
    }

    pub fn url(&self) -> String {
        self.document.borrow().url()
    }

    pub fn title(&self) -> String {
        self.document.borrow().title()
    }

    /// Shared document handle
    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    /// Borrow the document for reading
    pub fn dom(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn script_context(&self) -> Option<&ScriptContext> {
        self.scripts.as_ref()
    }

    pub fn scripts_executed(&self) -> usize {
        self.scripts_executed
    }

    pub fn script_errors(&self) -> usize {
        self.script_errors
    }

    /// Evaluate script against the page
    pub fn eval(&self, code: &str) -> anyhow::Result<JsValue> {
        let scripts = self
            .scripts
            .as_ref()
            .context("scripting is disabled for this page")?;
        Ok(scripts.eval(code)?)
    }

    /// Deliver pending mutation records
    ///
    /// Without a script context only native observers exist.
    pub fn run_microtasks(&self) -> anyhow::Result<usize> {
        match &self.scripts {
            Some(scripts) => Ok(scripts.perform_microtask_checkpoint()?),
            None => Ok(self.document.borrow_mut().deliver_mutation_records()),
        }
    }

    /// Script GC followed by a sweep of detached nodes
    pub fn collect_garbage(&self) -> anyhow::Result<usize> {
        match &self.scripts {
            Some(scripts) => Ok(scripts.collect_garbage()?),
            None => Ok(self.document.borrow_mut().collect_garbage()),
        }
    }
}

/// `<script>` elements without `src` whose type is classic JavaScript
fn inline_scripts(doc: &Document) -> Vec<NodeId> {
    doc.tree()
        .descendants(doc.root())
        .filter(|&id| {
            doc.get(id)
                .and_then(|node| node.as_element())
                .is_some_and(|el| {
                    el.local_name() == "script"
                        && el.get_attr("src").is_none()
                        && el.get_attr("type").is_none_or(is_javascript_type)
                })
        })
        .collect()
}

fn is_javascript_type(script_type: &str) -> bool {
    let script_type = script_type.trim();
    script_type.is_empty()
        || script_type.eq_ignore_ascii_case("text/javascript")
        || script_type.eq_ignore_ascii_case("application/javascript")
}
