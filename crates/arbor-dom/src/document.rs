//! Document - tree owner and lifecycle
//!
//! Owns the arena, the tree scopes, the observer registry and the wrapper
//! table. Tree operations live in `mutate.rs` and `element.rs`, lifetime
//! management in `binding.rs`.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::attributes::ElementDataCache;
use crate::binding::WrapperTable;
use crate::client::{
    DocumentClient, HostErrorChannel, Milestone, TracingErrorChannel, WrapperClient,
};
use crate::collections::CollectionCache;
use crate::engine::EngineState;
use crate::error::{CallbackError, DomError, DomResult};
use crate::flags::NodeFlags;
use crate::mutation::{MutationNotifier, MutationRecord, ObserverId};
use crate::node::{Node, NodeType};
use crate::security::{CookieJar, SecurityOrigin};
use crate::tree::DomTree;
use crate::tree_scope::{IdTargetObserver, TreeScope, TreeScopeKind};
use crate::NodeId;

/// Nested `write()` calls beyond this depth are dropped
pub const MAX_WRITE_RECURSION_DEPTH: u32 = 20;

/// Parsing state machine; only `open()` moves it backwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParsingState {
    Parsing,
    InDomContentLoaded,
    FinishedParsing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Interactive => "interactive",
            Self::Complete => "complete",
        }
    }
}

/// Markup parser driven by `open()/write()/close()`
///
/// Builds nodes through the document's parser-facing API
/// (`create_element_for_parser`, `parser_append_child`, ...).
pub trait DocumentParser {
    /// Feed more markup
    fn append(&mut self, document: &mut Document, markup: &str);

    /// End of input: flush whatever is buffered into the tree
    fn finish(self: Box<Self>, document: &mut Document);
}

/// Creates a fresh parser for each `open()`
pub type ParserFactory = Rc<dyn Fn() -> Box<dyn DocumentParser>>;

/// Document construction parameters
#[derive(Clone, Default)]
pub struct DocumentInit {
    url: Option<String>,
    referrer: String,
    cookie_jar: Option<Rc<dyn CookieJar>>,
    parser_factory: Option<ParserFactory>,
    client: Option<Rc<dyn DocumentClient>>,
    wrapper_client: Option<Rc<dyn WrapperClient>>,
    error_channel: Option<Rc<dyn HostErrorChannel>>,
    character_set: Option<String>,
    last_modified: Option<String>,
}

impl DocumentInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn with_cookie_jar(mut self, jar: Rc<dyn CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn with_parser_factory(mut self, factory: ParserFactory) -> Self {
        self.parser_factory = Some(factory);
        self
    }

    pub fn with_client(mut self, client: Rc<dyn DocumentClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_wrapper_client(mut self, client: Rc<dyn WrapperClient>) -> Self {
        self.wrapper_client = Some(client);
        self
    }

    pub fn with_error_channel(mut self, channel: Rc<dyn HostErrorChannel>) -> Self {
        self.error_channel = Some(channel);
        self
    }

    pub fn with_character_set(mut self, charset: impl Into<String>) -> Self {
        self.character_set = Some(charset.into());
        self
    }

    /// `MM/DD/YYYY hh:mm:ss`, as reported by `lastModified`
    pub fn with_last_modified(mut self, last_modified: impl Into<String>) -> Self {
        self.last_modified = Some(last_modified.into());
        self
    }
}

/// HTML Document
pub struct Document {
    pub(crate) tree: DomTree,
    pub(crate) root: NodeId,
    pub(crate) scopes: HashMap<NodeId, TreeScope>,
    pub(crate) notifier: MutationNotifier,
    pub(crate) wrappers: WrapperTable,
    pub(crate) element_data_cache: ElementDataCache,
    pub(crate) collections: CollectionCache,
    pub(crate) engine: Rc<EngineState>,
    pub(crate) client: Option<Rc<dyn DocumentClient>>,
    pub(crate) wrapper_client: Option<Rc<dyn WrapperClient>>,
    error_channel: Rc<dyn HostErrorChannel>,

    document_id: u64,
    tree_version: u64,
    parsing_state: ParsingState,
    ready_state: ReadyState,
    load_event_delay_count: u32,
    load_event_fired: bool,

    parser: Option<Box<dyn DocumentParser>>,
    parser_factory: Option<ParserFactory>,
    /// Parser is checked out and running
    parser_busy: bool,
    pending_writes: String,
    write_recursion_depth: u32,

    url: Option<Url>,
    referrer: String,
    origin: SecurityOrigin,
    cookie_jar: Option<Rc<dyn CookieJar>>,
    character_set: String,
    last_modified: Option<String>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.document_id)
            .field("url", &self.url())
            .field("nodes", &self.tree.len())
            .field("parsing_state", &self.parsing_state)
            .field("ready_state", &self.ready_state)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Create an empty document still in the `Parsing` state
    pub fn empty(engine: Rc<EngineState>, init: DocumentInit) -> Self {
        let mut tree = DomTree::new();
        let root = tree.insert(Node::document());
        if let Some(node) = tree.get_mut(root) {
            node.tree_scope = Some(root);
        }

        let url = init.url.as_deref().and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(url = raw, error = %err, "Invalid document URL, using about:blank");
                None
            }
        });
        let origin = match &url {
            Some(url) => SecurityOrigin::from_url(url),
            None => SecurityOrigin::opaque(),
        };

        let mut scopes = HashMap::new();
        scopes.insert(root, TreeScope::new(root, TreeScopeKind::Document));

        let document_id = engine.allocate_document_id();
        let cache_capacity = engine.features().element_data_cache_capacity;
        tracing::debug!(document_id, url = ?url.as_ref().map(Url::as_str), "Document created");

        Self {
            tree,
            root,
            scopes,
            notifier: MutationNotifier::new(),
            wrappers: WrapperTable::default(),
            element_data_cache: ElementDataCache::new(cache_capacity),
            collections: CollectionCache::default(),
            engine,
            client: init.client,
            wrapper_client: init.wrapper_client,
            error_channel: init
                .error_channel
                .unwrap_or_else(|| Rc::new(TracingErrorChannel)),
            document_id,
            tree_version: 0,
            parsing_state: ParsingState::Parsing,
            ready_state: ReadyState::Loading,
            load_event_delay_count: 0,
            load_event_fired: false,
            parser: None,
            parser_factory: init.parser_factory,
            parser_busy: false,
            pending_writes: String::new(),
            write_recursion_depth: 0,
            url,
            referrer: init.referrer,
            origin,
            cookie_jar: init.cookie_jar,
            character_set: init.character_set.unwrap_or_else(|| "UTF-8".to_string()),
            last_modified: init.last_modified,
        }
    }

    /// Create a finished document with the `html/head/body` skeleton
    pub fn new(engine: Rc<EngineState>, init: DocumentInit) -> Self {
        let mut doc = Self::empty(engine, init);
        let root = doc.root;
        let html = doc.create_element_for_parser("html", Vec::new());
        let head = doc.create_element_for_parser("head", Vec::new());
        let body = doc.create_element_for_parser("body", Vec::new());
        for (parent, child) in [(root, html), (html, head), (html, body)] {
            if let Err(err) = doc.parser_append_child(parent, child) {
                unreachable!("skeleton insertion failed: {err}");
            }
        }
        for element in [head, body, html] {
            doc.finish_parsing_children(element);
        }
        doc.finish_parsing();
        doc
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.tree.get(id)
    }

    /// Resolve a node or fail the way torn-down nodes do
    pub fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.tree
            .get(id)
            .ok_or_else(|| DomError::invalid_state("node has been destroyed"))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.tree
            .get_mut(id)
            .ok_or_else(|| DomError::invalid_state("node has been destroyed"))
    }

    pub fn engine(&self) -> &Rc<EngineState> {
        &self.engine
    }

    pub fn document_id(&self) -> u64 {
        self.document_id
    }

    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// Stamp of the last shape-altering mutation (drawn from the global
    /// counter, so stamps never repeat across documents)
    pub fn tree_version(&self) -> u64 {
        self.tree_version
    }

    pub fn global_tree_version(&self) -> u64 {
        self.engine.global_tree_version()
    }

    pub(crate) fn bump_tree_version(&mut self) {
        self.tree_version = self.engine.bump_global_tree_version();
    }

    pub fn scope(&self, root: NodeId) -> Option<&TreeScope> {
        self.scopes.get(&root)
    }

    /// Tree-order-first element with this id in the document scope
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.get_element_by_id_in(self.root, id)
    }

    /// Lookup in the scope rooted at `scope_root` (document or shadow root)
    pub fn get_element_by_id_in(&self, scope_root: NodeId, id: &str) -> Option<NodeId> {
        self.scopes.get(&scope_root)?.get_element_by_id(&self.tree, id)
    }

    pub fn add_id_target_observer(&mut self, id: &str, observer: Rc<dyn IdTargetObserver>) {
        if let Some(scope) = self.scopes.get_mut(&self.root) {
            scope.add_id_target_observer(id, observer);
        }
    }

    pub fn remove_id_target_observer(&mut self, id: &str, observer: &Rc<dyn IdTargetObserver>) {
        if let Some(scope) = self.scopes.get_mut(&self.root) {
            scope.remove_id_target_observer(id, observer);
        }
    }

    /// Run id-target observers queued by the mutation that just finished
    pub(crate) fn notify_id_targets(&mut self) {
        let mut pending = Vec::new();
        for scope in self.scopes.values_mut() {
            pending.extend(scope.take_pending_id_targets());
        }
        for (id, observers) in pending {
            for observer in observers {
                observer.id_target_changed(&id);
            }
        }
    }

    // ---- Lifecycle ----

    pub fn parsing_state(&self) -> ParsingState {
        self.parsing_state
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn is_parsing(&self) -> bool {
        self.parsing_state == ParsingState::Parsing
    }

    pub fn has_active_parser(&self) -> bool {
        self.parser.is_some() || self.parser_busy
    }

    /// Parsing -> InDomContentLoaded
    pub fn dom_content_loaded(&mut self) {
        assert!(
            self.parsing_state == ParsingState::Parsing,
            "DOMContentLoaded fired twice (state {:?})",
            self.parsing_state
        );
        self.parsing_state = ParsingState::InDomContentLoaded;
        self.ready_state = ReadyState::Interactive;
        tracing::debug!(document_id = self.document_id, "DOMContentLoaded");
        if let Some(client) = &self.client {
            client.milestone(Milestone::DomContentLoaded);
        }
    }

    /// InDomContentLoaded -> FinishedParsing, then try to fire load
    pub fn finish_parsing(&mut self) {
        if self.parsing_state == ParsingState::Parsing {
            self.dom_content_loaded();
        }
        assert!(
            self.parsing_state == ParsingState::InDomContentLoaded,
            "finish_parsing called in state {:?}",
            self.parsing_state
        );
        self.parsing_state = ParsingState::FinishedParsing;
        let root = self.root;
        if let Some(node) = self.tree.get_mut(root) {
            node.flags.insert(NodeFlags::FINISHED_PARSING_CHILDREN);
        }
        tracing::debug!(
            document_id = self.document_id,
            nodes = self.tree.len(),
            "Finished parsing"
        );
        self.check_completed();
    }

    pub fn load_event_delay_count(&self) -> u32 {
        self.load_event_delay_count
    }

    pub fn increment_load_event_delay_count(&mut self) {
        self.load_event_delay_count += 1;
    }

    pub fn decrement_load_event_delay_count(&mut self) {
        assert!(
            self.load_event_delay_count > 0,
            "load event delay count decremented below zero"
        );
        self.load_event_delay_count -= 1;
        if self.load_event_delay_count == 0 {
            self.check_completed();
        }
    }

    pub fn load_event_fired(&self) -> bool {
        self.load_event_fired
    }

    /// Fire `load` once parsing finished and nothing delays it
    pub fn check_completed(&mut self) {
        if self.parsing_state != ParsingState::FinishedParsing
            || self.load_event_delay_count > 0
            || self.load_event_fired
        {
            return;
        }
        self.load_event_fired = true;
        self.ready_state = ReadyState::Complete;
        tracing::debug!(document_id = self.document_id, "Load event");
        if let Some(client) = &self.client {
            client.milestone(Milestone::Load);
        }
    }

    // ---- open / write / close ----

    /// Discard the tree and start a fresh parse
    ///
    /// Every node but the document node is destroyed and their wrappers are
    /// invalidated. Ignored while the parser itself is running.
    pub fn open(&mut self) -> DomResult<()> {
        if !self.engine.features().document_write {
            return Err(DomError::NotSupported("document.open is disabled".into()));
        }
        if self.parser_busy {
            tracing::debug!("Ignoring open() from inside the running parser");
            return Ok(());
        }
        if self.parser.take().is_some() {
            tracing::debug!("Aborting active parser");
        }

        let root = self.root;
        let children: Vec<NodeId> = self.tree.children(root).collect();
        if let Some(client) = self.client.clone() {
            for &child in &children {
                for id in self.tree.inclusive_descendants(child) {
                    client.node_will_be_removed(id);
                }
            }
        }
        let mut destroyed = 0;
        for child in children {
            destroyed += self.destroy_subtree(child);
        }
        // Detached nodes go too, so no stale wrapper survives
        for id in self.tree.node_ids() {
            if id != root && self.tree.contains(id) && self.tree.parent(id).is_none() {
                destroyed += self.destroy_subtree(id);
            }
        }

        self.scopes.clear();
        self.scopes
            .insert(root, TreeScope::new(root, TreeScopeKind::Document));
        self.element_data_cache.clear();
        self.collections.clear();
        self.bump_tree_version();

        self.parsing_state = ParsingState::Parsing;
        self.ready_state = ReadyState::Loading;
        self.load_event_fired = false;
        self.pending_writes.clear();
        if let Some(node) = self.tree.get_mut(root) {
            node.flags.remove(NodeFlags::FINISHED_PARSING_CHILDREN);
        }
        self.parser = self.parser_factory.as_ref().map(|factory| factory());
        tracing::debug!(document_id = self.document_id, destroyed, "Document opened");
        Ok(())
    }

    /// Feed markup to the parser, opening the document first if no parser
    /// is active
    pub fn write(&mut self, text: &str) -> DomResult<()> {
        if !self.engine.features().document_write {
            return Err(DomError::NotSupported("document.write is disabled".into()));
        }
        if self.parser_busy {
            // Reentrant write from inside the parser, fed when it yields
            self.pending_writes.push_str(text);
            return Ok(());
        }
        if self.write_recursion_depth >= MAX_WRITE_RECURSION_DEPTH {
            tracing::warn!(
                depth = self.write_recursion_depth,
                "document.write recursion limit reached"
            );
            return Ok(());
        }
        if self.parser.is_none() {
            self.open()?;
        }
        let Some(mut parser) = self.parser.take() else {
            return Err(DomError::NotSupported("no parser installed".into()));
        };

        self.write_recursion_depth += 1;
        self.parser_busy = true;
        parser.append(self, text);
        while !self.pending_writes.is_empty()
            && self.write_recursion_depth < MAX_WRITE_RECURSION_DEPTH
        {
            let queued = std::mem::take(&mut self.pending_writes);
            self.write_recursion_depth += 1;
            parser.append(self, &queued);
        }
        if !self.pending_writes.is_empty() {
            tracing::warn!("Dropping document.write output past the recursion limit");
            self.pending_writes.clear();
        }
        self.parser_busy = false;
        self.write_recursion_depth = 0;
        self.parser = Some(parser);
        Ok(())
    }

    pub fn writeln(&mut self, text: &str) -> DomResult<()> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.write(&line)
    }

    /// Flush the parser and finish parsing
    pub fn close(&mut self) -> DomResult<()> {
        if self.parser_busy {
            return Ok(());
        }
        let Some(parser) = self.parser.take() else {
            return Ok(());
        };
        self.parser_busy = true;
        parser.finish(self);
        self.parser_busy = false;
        if self.parsing_state != ParsingState::FinishedParsing {
            self.finish_parsing();
        }
        Ok(())
    }

    // ---- Mutation observers ----

    pub fn notifier(&self) -> &MutationNotifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut MutationNotifier {
        &mut self.notifier
    }

    pub fn error_channel(&self) -> &Rc<dyn HostErrorChannel> {
        &self.error_channel
    }

    /// Attach the script runtime's wrapper hooks
    ///
    /// Bindings made before this call are not replayed to the new client.
    pub fn set_wrapper_client(&mut self, client: Option<Rc<dyn WrapperClient>>) {
        self.wrapper_client = client;
    }

    /// Drain one round of queued records
    ///
    /// Embedders that deliver to script callbacks themselves call this, run
    /// the callbacks without holding the document, then loop.
    pub fn take_mutation_deliveries(&mut self) -> Vec<(ObserverId, Vec<MutationRecord>)> {
        self.notifier.take_pending()
    }

    /// Hand `records` to the observer's native callback, if it has one
    pub fn deliver_to(&mut self, observer: ObserverId, records: &[MutationRecord]) {
        let Some(callback) = self.notifier.callback(observer) else {
            return;
        };
        if let Err(err) = callback.call(records, self) {
            self.report_callback_error(&err);
        }
    }

    pub fn report_callback_error(&self, err: &CallbackError) {
        self.error_channel.report_error(err);
    }

    /// Microtask checkpoint for native observers
    ///
    /// Observers are snapshotted per round; records queued by callbacks are
    /// delivered in the following round. Returns the number of callbacks run.
    pub fn deliver_mutation_records(&mut self) -> usize {
        let mut delivered = 0;
        loop {
            let batch = self.take_mutation_deliveries();
            if batch.is_empty() {
                break;
            }
            for (observer, records) in batch {
                self.deliver_to(observer, &records);
                delivered += 1;
            }
        }
        delivered
    }

    // ---- Accessors ----

    pub fn url(&self) -> String {
        self.url
            .as_ref()
            .map_or_else(|| "about:blank".to_string(), |u| u.to_string())
    }

    pub fn parsed_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn referrer(&self) -> &str {
        &self.referrer
    }

    pub fn security_origin(&self) -> &SecurityOrigin {
        &self.origin
    }

    /// Same-origin check hook
    pub fn can_access(&self, other: &Document) -> bool {
        self.origin.can_access(&other.origin)
    }

    pub fn domain(&self) -> String {
        self.origin.host().unwrap_or_default()
    }

    pub fn character_set(&self) -> &str {
        &self.character_set
    }

    pub fn last_modified(&self) -> String {
        self.last_modified
            .clone()
            .unwrap_or_else(|| format_last_modified(SystemTime::now()))
    }

    pub fn cookie(&self) -> DomResult<String> {
        if self.origin.is_opaque() {
            return Err(DomError::Security(
                "cookies are not available for opaque origins".into(),
            ));
        }
        match (&self.cookie_jar, &self.url) {
            (Some(jar), Some(url)) => Ok(jar.cookies(url)),
            _ => Ok(String::new()),
        }
    }

    pub fn set_cookie(&mut self, cookie: &str) -> DomResult<()> {
        if self.origin.is_opaque() {
            return Err(DomError::Security(
                "cookies are not available for opaque origins".into(),
            ));
        }
        if let (Some(jar), Some(url)) = (&self.cookie_jar, &self.url) {
            jar.set_cookie(url, cookie);
        }
        Ok(())
    }

    /// Root element
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree
            .children(self.root)
            .find(|&id| self.tree.get(id).is_some_and(Node::is_element))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_element_named(self.document_element()?, &["head"])
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_element_named(self.document_element()?, &["body", "frameset"])
    }

    fn child_element_named(&self, parent: NodeId, names: &[&str]) -> Option<NodeId> {
        self.tree.children(parent).find(|&id| {
            self.tree
                .get(id)
                .and_then(Node::as_element)
                .is_some_and(|e| names.contains(&e.local_name()))
        })
    }

    fn title_element(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.tree.inclusive_descendants(html).find(|&id| {
            self.tree
                .get(id)
                .and_then(Node::as_element)
                .is_some_and(|e| e.local_name() == "title")
        })
    }

    /// Text of the first `<title>`, whitespace stripped and collapsed
    pub fn title(&self) -> String {
        let Some(title) = self.title_element() else {
            return String::new();
        };
        let text = self.text_content(title).unwrap_or_default();
        text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Replace the `<title>` text, creating the element in `<head>` if needed
    pub fn set_title(&mut self, title: &str) -> DomResult<()> {
        let element = match self.title_element() {
            Some(element) => element,
            None => {
                let Some(head) = self.head() else {
                    return Ok(());
                };
                let element = self.create_element("title")?;
                self.append_child(head, element)?;
                element
            }
        };
        self.set_text_content(element, title)
    }

    pub fn node_type(&self, id: NodeId) -> DomResult<NodeType> {
        Ok(self.node(id)?.node_type())
    }
}

/// `MM/DD/YYYY hh:mm:ss` in UTC
fn format_last_modified(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;

    // Days since epoch to civil date
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{month:02}/{day:02}/{year:04} {:02}:{:02}:{:02}",
        rem / 3_600,
        (rem % 3_600) / 60,
        rem % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::MemoryCookieJar;
    use std::cell::RefCell;
    use std::time::Duration;

    fn engine() -> Rc<EngineState> {
        Rc::new(EngineState::default())
    }

    #[derive(Default)]
    struct Milestones(RefCell<Vec<Milestone>>);

    impl DocumentClient for Milestones {
        fn milestone(&self, milestone: Milestone) {
            self.0.borrow_mut().push(milestone);
        }
    }

    #[test]
    fn test_skeleton_document() {
        let doc = Document::new(engine(), DocumentInit::new());
        let html = doc.document_element().unwrap();
        assert_eq!(doc.get(html).unwrap().node_name(), "HTML");
        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert_eq!(doc.url(), "about:blank");
        assert_eq!(doc.character_set(), "UTF-8");
    }

    #[test]
    fn test_load_waits_for_delay_counter() {
        let milestones = Rc::new(Milestones::default());
        let init = DocumentInit::new().with_client(milestones.clone());
        let mut doc = Document::empty(engine(), init);

        doc.increment_load_event_delay_count();
        doc.finish_parsing();
        assert_eq!(doc.ready_state(), ReadyState::Interactive);
        assert!(!doc.load_event_fired());

        doc.decrement_load_event_delay_count();
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert_eq!(
            *milestones.0.borrow(),
            vec![Milestone::DomContentLoaded, Milestone::Load]
        );
    }

    #[test]
    #[should_panic(expected = "below zero")]
    fn test_delay_counter_underflow_is_fatal() {
        let mut doc = Document::empty(engine(), DocumentInit::new());
        doc.decrement_load_event_delay_count();
    }

    #[test]
    #[should_panic(expected = "finish_parsing called")]
    fn test_no_back_transition() {
        let mut doc = Document::empty(engine(), DocumentInit::new());
        doc.finish_parsing();
        doc.finish_parsing();
    }

    #[test]
    fn test_tree_version_only_moves_on_shape_changes() {
        let mut doc = Document::new(engine(), DocumentInit::new());
        let body = doc.body().unwrap();
        let before = doc.tree_version();

        doc.set_attribute(body, "class", "x").unwrap();
        assert_eq!(doc.tree_version(), before);

        let div = doc.create_element("div").unwrap();
        doc.append_child(body, div).unwrap();
        assert!(doc.tree_version() > before);
        assert_eq!(doc.tree_version(), doc.global_tree_version());
    }

    #[test]
    fn test_tree_versions_unique_across_documents() {
        let shared = engine();
        let mut a = Document::new(shared.clone(), DocumentInit::new());
        let mut b = Document::new(shared, DocumentInit::new());
        let (body_a, body_b) = (a.body().unwrap(), b.body().unwrap());

        let x = a.create_element("p").unwrap();
        a.append_child(body_a, x).unwrap();
        let y = b.create_element("p").unwrap();
        b.append_child(body_b, y).unwrap();
        assert!(b.tree_version() > a.tree_version());
    }

    #[test]
    fn test_cookie_requires_tuple_origin() {
        let jar = Rc::new(MemoryCookieJar::new());
        let mut doc = Document::new(
            engine(),
            DocumentInit::new()
                .with_url("https://example.com/page")
                .with_cookie_jar(jar),
        );
        doc.set_cookie("session=abc; Secure").unwrap();
        assert_eq!(doc.cookie().unwrap(), "session=abc");
        assert_eq!(doc.domain(), "example.com");

        let blank = Document::new(engine(), DocumentInit::new());
        assert!(matches!(blank.cookie(), Err(DomError::Security(_))));
    }

    #[test]
    fn test_title_round_trip() {
        let mut doc = Document::new(engine(), DocumentInit::new());
        assert_eq!(doc.title(), "");
        doc.set_title("  Hello   world ").unwrap();
        assert_eq!(doc.title(), "Hello world");
        doc.set_title("Again").unwrap();
        assert_eq!(doc.title(), "Again");
    }

    #[test]
    fn test_write_without_parser_fails() {
        let mut doc = Document::new(engine(), DocumentInit::new());
        assert!(matches!(doc.write("<p>"), Err(DomError::NotSupported(_))));
        // open() still ran and discarded the tree
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.ready_state(), ReadyState::Loading);
    }

    #[test]
    fn test_format_last_modified() {
        let t = UNIX_EPOCH + Duration::from_secs(951_782_400 + 3_661);
        assert_eq!(format_last_modified(t), "02/29/2000 01:01:01");
    }
}
