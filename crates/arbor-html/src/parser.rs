//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and replays it into an Arbor document. The RcDom
//! builder is not incremental, so markup fed through `write()` is buffered
//! and tree-built in one go when the document is closed.

use std::rc::Rc;

use arbor_dom::{
    Attribute, CallbackError, Document, DocumentInit, DocumentParser, DomError, EngineState, NodeId,
};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser producing finished documents
pub struct HtmlParser {
    engine: Rc<EngineState>,
}

impl HtmlParser {
    pub fn new(engine: Rc<EngineState>) -> Self {
        Self { engine }
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_init(html, DocumentInit::new())
    }

    /// Parse with explicit document parameters (URL, client, cookie jar...)
    ///
    /// The HTML parser factory is installed so later `open()/write()` calls
    /// on the result parse HTML too.
    pub fn parse_with_init(&self, html: &str, init: DocumentInit) -> Result<Document, ParseError> {
        let init = init.with_parser_factory(crate::parser_factory());
        let mut document = Document::empty(self.engine.clone(), init);
        tracing::debug!(url = %document.url(), bytes = html.len(), "Parsing HTML document");

        let created = build_tree(&mut document, html)?;
        document.finish_parsing();

        tracing::debug!("Parsed {} nodes", created);
        Ok(document)
    }
}

/// [`DocumentParser`] behind `Document::open()/write()/close()`
#[derive(Debug, Default)]
pub struct HtmlDocumentParser {
    buffer: String,
}

impl HtmlDocumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markup received so far
    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}

impl DocumentParser for HtmlDocumentParser {
    fn append(&mut self, _document: &mut Document, markup: &str) {
        tracing::trace!(bytes = markup.len(), "Buffering written markup");
        self.buffer.push_str(markup);
    }

    /// Tree-build the buffered markup; failures go to the document's error channel
    fn finish(self: Box<Self>, document: &mut Document) {
        match build_tree(document, &self.buffer) {
            Ok(created) => tracing::debug!(created, "Written markup parsed"),
            Err(err) => {
                tracing::error!(error = %err, "Failed to parse written markup");
                document.report_callback_error(&CallbackError::new(format!(
                    "document.close(): {err}"
                )));
            }
        }
    }
}

/// Tree-build `html` under the document node; returns the node count added
fn build_tree(document: &mut Document, html: &str) -> Result<usize, ParseError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    let root = document.root();
    let mut converter = Converter {
        document,
        created: 0,
    };
    converter.convert(&dom.document, root)?;
    Ok(converter.created)
}

/// Pending work for the tree walk
enum Step {
    /// Convert an RcDom node and append it under the given parent
    Visit(Handle, NodeId),
    /// All children of the element are in place
    Close(NodeId),
}

struct Converter<'a> {
    document: &'a mut Document,
    created: usize,
}

impl Converter<'_> {
    /// Replay the RcDom under `parent` in document order
    ///
    /// Walks with an explicit stack so nesting depth is bounded by the heap.
    fn convert(&mut self, handle: &Handle, parent: NodeId) -> Result<(), DomError> {
        let mut stack = vec![Step::Visit(handle.clone(), parent)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(handle, parent) => self.convert_node(&handle, parent, &mut stack)?,
                Step::Close(id) => self.document.finish_parsing_children(id),
            }
        }
        Ok(())
    }

    fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.document.parser_append_child(parent, child)?;
        self.created += 1;
        Ok(())
    }

    /// Queue children so they pop in source order
    fn push_children(stack: &mut Vec<Step>, handle: &Handle, parent: NodeId) {
        let children = handle.children.borrow();
        stack.extend(children.iter().rev().map(|child| Step::Visit(child.clone(), parent)));
    }

    /// Convert one RcDom node to our DOM format, queueing its children
    fn convert_node(
        &mut self,
        handle: &Handle,
        parent: NodeId,
        stack: &mut Vec<Step>,
    ) -> Result<(), DomError> {
        match &handle.data {
            RcNodeData::Document => Self::push_children(stack, handle, parent),
            RcNodeData::Doctype {
                name,
                public_id,
                system_id,
            } => {
                let id = self.document.create_document_type(name, public_id, system_id);
                self.append(parent, id)?;
            }
            RcNodeData::Text { contents } => {
                let id = self.document.create_text_node(&contents.borrow());
                self.append(parent, id)?;
            }
            RcNodeData::Comment { contents } => {
                let id = self.document.create_comment(contents);
                self.append(parent, id)?;
            }
            RcNodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let attrs = attrs
                    .borrow()
                    .iter()
                    .map(|attr| Attribute::new(&*attr.name.local, &*attr.value))
                    .collect();
                let id = self.document.create_element_for_parser(&name.local, attrs);
                self.append(parent, id)?;

                stack.push(Step::Close(id));
                // Template contents are flattened into the element, after its children
                if let Some(contents) = template_contents.borrow().as_ref() {
                    Self::push_children(stack, contents, id);
                }
                Self::push_children(stack, handle, id);
            }
            RcNodeData::ProcessingInstruction { target, contents } => {
                match self.document.create_processing_instruction(target, contents) {
                    Ok(id) => self.append(parent, id)?,
                    Err(err) => tracing::warn!(error = %err, "Dropping processing instruction"),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> HtmlParser {
        HtmlParser::new(Rc::new(EngineState::default()))
    }

    #[test]
    fn test_parse_simple() {
        let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let doc = parser().parse(html).unwrap();

        assert!(doc.node_count() > 1, "Expected more than 1 node, got {}", doc.node_count());
        assert_eq!(doc.title(), "Test");
        assert!(doc.load_event_fired());
    }

    #[test]
    fn test_parse_fragment() {
        let doc = parser().parse("<div><span>Text</span></div>").unwrap();

        // Even fragments get wrapped in html/head/body by html5ever
        assert!(doc.head().is_some());
        let body = doc.body().unwrap();
        assert_eq!(doc.text_content(body).as_deref(), Some("Text"));
    }

    #[test]
    fn test_buffered_until_finish() {
        let mut doc = Document::empty(Rc::new(EngineState::default()), DocumentInit::new());
        let mut parser = Box::new(HtmlDocumentParser::new());
        parser.append(&mut doc, "<p id=a>");
        parser.append(&mut doc, "one</p>");
        assert_eq!(parser.buffered(), "<p id=a>one</p>");
        assert_eq!(doc.node_count(), 1);

        parser.finish(&mut doc);
        let p = doc.get_element_by_id("a").unwrap();
        assert_eq!(doc.text_content(p).as_deref(), Some("one"));
    }
}
