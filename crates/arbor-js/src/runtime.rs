//! Script context bound to one document
//!
//! Owns the QuickJS runtime, installs the bindings and runs the microtask
//! checkpoint that delivers mutation records to script observers.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use arbor_dom::{CallbackError, Document, MutationRecord, ObserverId};
use rquickjs::{Context, Ctx, Function, Runtime, Value};

use crate::bindings::{self, DomBridge, RecordHandles, WrapperTracker, DELIVER_RECORDS};
use crate::console::{self, format_value};
use crate::prelude::DOM_PRELUDE;
use crate::{JsError, JsValue};

/// Default heap limit for a script context
pub const DEFAULT_MEMORY_LIMIT: usize = 32 * 1024 * 1024;

/// JavaScript context with the DOM bindings installed
pub struct ScriptContext {
    runtime: Runtime,
    context: Context,
    document: Rc<RefCell<Document>>,
    wrappers: Rc<WrapperTracker>,
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("wrappers", &self.wrappers.outstanding())
            .finish_non_exhaustive()
    }
}

impl ScriptContext {
    pub fn new(document: Rc<RefCell<Document>>) -> Result<Self, JsError> {
        Self::with_memory_limit(document, DEFAULT_MEMORY_LIMIT)
    }

    /// Create a context whose heap is capped at `limit` bytes
    pub fn with_memory_limit(
        document: Rc<RefCell<Document>>,
        limit: usize,
    ) -> Result<Self, JsError> {
        let runtime = Runtime::new().map_err(|e| JsError::Runtime(e.to_string()))?;
        runtime.set_memory_limit(limit);
        let context = Context::full(&runtime).map_err(|e| JsError::Runtime(e.to_string()))?;

        let wrappers = Rc::new(WrapperTracker::default());
        document
            .try_borrow_mut()
            .map_err(|_| JsError::Runtime("document is already borrowed".into()))?
            .set_wrapper_client(Some(wrappers.clone()));

        let bridge = DomBridge::new(document.clone(), wrappers.clone());
        context.with(|ctx| {
            install(&ctx, &bridge).map_err(|e| script_error(&ctx, e))
        })?;
        tracing::debug!(memory_limit = limit, "Script context created");

        Ok(Self {
            runtime,
            context,
            document,
            wrappers,
        })
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    /// Evaluate a script and run the microtask checkpoint
    pub fn eval(&self, code: &str) -> Result<JsValue, JsError> {
        let value = self.context.with(|ctx| {
            let result: Value = ctx.eval(code).map_err(|e| script_error(&ctx, e))?;
            Ok::<_, JsError>(JsValue::from_js(&result))
        })?;
        self.perform_microtask_checkpoint()?;
        Ok(value)
    }

    /// Execute a script (ignore result)
    pub fn exec(&self, code: &str) -> Result<(), JsError> {
        self.eval(code).map(drop)
    }

    /// Drain promise jobs, then deliver queued mutation records until no
    /// observer has anything pending
    ///
    /// Records queued by an observer callback are delivered in the next
    /// round. Callback failures go to the document's error channel. Returns
    /// the number of callbacks invoked.
    pub fn perform_microtask_checkpoint(&self) -> Result<usize, JsError> {
        let mut delivered = 0;
        loop {
            self.run_pending_jobs();
            let batch = self.document_mut()?.take_mutation_deliveries();
            if batch.is_empty() {
                break;
            }
            for (observer, records) in batch {
                self.deliver(observer, &records)?;
                delivered += 1;
            }
        }
        if delivered > 0 {
            tracing::trace!(delivered, "Microtask checkpoint");
        }
        Ok(delivered)
    }

    /// Run queued promise and finalizer jobs
    pub fn run_pending_jobs(&self) {
        while self.runtime.is_job_pending() {
            match self.runtime.execute_pending_job() {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => {
                    let message = self.context.with(|ctx| describe_exception(&ctx.catch()));
                    tracing::warn!(error = %message, "Uncaught exception in pending job");
                }
            }
        }
    }

    /// Collect unreachable script objects, release their wrappers and
    /// sweep detached nodes nothing else holds
    pub fn collect_garbage(&self) -> Result<usize, JsError> {
        self.runtime.run_gc();
        self.run_pending_jobs();
        let destroyed = self.document_mut()?.collect_garbage();
        tracing::debug!(destroyed, wrappers = self.wrappers.outstanding(), "Script GC finished");
        Ok(destroyed)
    }

    /// Wrapper handles currently held by script objects
    pub fn wrapper_count(&self) -> usize {
        self.wrappers.outstanding()
    }

    /// Wrappers whose node was destroyed while the object was alive
    pub fn invalidated_wrapper_count(&self) -> usize {
        self.wrappers.invalidated()
    }

    fn document_mut(&self) -> Result<RefMut<'_, Document>, JsError> {
        self.document
            .try_borrow_mut()
            .map_err(|_| JsError::Runtime("document is borrowed outside the script context".into()))
    }

    fn deliver(&self, observer: ObserverId, records: &[MutationRecord]) -> Result<(), JsError> {
        let native = self.document.borrow().notifier().callback(observer).is_some();
        if native {
            self.document_mut()?.deliver_to(observer, records);
            return Ok(());
        }

        let resolved: Vec<RecordHandles> = {
            let mut doc = self.document_mut()?;
            records
                .iter()
                .map(|record| RecordHandles::resolve(&mut doc, record))
                .collect()
        };
        // The document is not borrowed while the callback runs
        let result = self.context.with(|ctx| {
            let call = || -> rquickjs::Result<()> {
                let deliver: Function = ctx.globals().get(DELIVER_RECORDS)?;
                let raws = resolved
                    .into_iter()
                    .map(|record| record.into_object(&ctx))
                    .collect::<rquickjs::Result<Vec<_>>>()?;
                deliver.call((observer.as_u64() as f64, raws))
            };
            call().map_err(|e| script_error(&ctx, e))
        });
        if let Err(err) = result {
            self.document
                .borrow()
                .report_callback_error(&CallbackError::new(err.to_string()));
        }
        Ok(())
    }
}

impl Drop for ScriptContext {
    fn drop(&mut self) {
        let Ok(mut doc) = self.document.try_borrow_mut() else {
            tracing::warn!("Document borrowed while dropping its script context");
            return;
        };
        doc.set_wrapper_client(None);
        let handles = self.wrappers.take_all();
        let released = handles.len();
        for handle in handles {
            doc.release_wrapper(handle);
        }
        tracing::debug!(released, "Script context dropped");
    }
}

fn install(ctx: &Ctx<'_>, bridge: &DomBridge) -> rquickjs::Result<()> {
    console::install_console(ctx)?;
    let dom = bindings::install_dom(ctx, bridge)?;
    let init: Function = ctx.eval(DOM_PRELUDE)?;
    init.call((dom,))
}

/// Turn a failed call into a [`JsError`], taking the pending exception
pub(crate) fn script_error(ctx: &Ctx<'_>, err: rquickjs::Error) -> JsError {
    if !err.is_exception() {
        return JsError::Runtime(err.to_string());
    }
    let caught = ctx.catch();
    let Some(obj) = caught.as_object() else {
        return JsError::Exception {
            name: "Error".into(),
            message: describe_exception(&caught),
        };
    };
    let name = obj
        .get::<_, Option<String>>("name")
        .ok()
        .flatten()
        .unwrap_or_else(|| "Error".into());
    let message = obj
        .get::<_, Option<String>>("message")
        .ok()
        .flatten()
        .unwrap_or_default();
    match name.as_str() {
        "SyntaxError" => JsError::Syntax(message),
        _ => JsError::Exception { name, message },
    }
}

fn describe_exception(value: &Value<'_>) -> String {
    if let Some(obj) = value.as_object() {
        let name = obj.get::<_, String>("name").unwrap_or_default();
        let message = obj.get::<_, String>("message").unwrap_or_default();
        if !name.is_empty() || !message.is_empty() {
            return format!("{name}: {message}");
        }
    }
    let mut out = String::new();
    format_value(&mut out, value);
    out
}
