//! Arbor HTML Parser
//!
//! HTML5 front-end built on html5ever. Markup is tokenized and tree-built
//! into an RcDom, then replayed into an Arbor [`Document`] through the
//! parser-facing API, so parsed elements get shared attribute storage and
//! the document's indexes are maintained as nodes arrive.

mod parser;

use std::rc::Rc;

use arbor_dom::{Document, DocumentInit, DocumentParser, DomError, EngineState, ParserFactory};

pub use parser::{HtmlDocumentParser, HtmlParser};

/// Parse an HTML string into a finished document at `about:blank`
pub fn parse(engine: Rc<EngineState>, html: &str) -> Result<Document, ParseError> {
    HtmlParser::new(engine).parse(html)
}

/// Factory for `Document::open()` / `write()`
pub fn parser_factory() -> ParserFactory {
    Rc::new(|| Box::new(HtmlDocumentParser::new()) as Box<dyn DocumentParser>)
}

/// Document init with the HTML parser factory installed
pub fn html_document_init() -> DocumentInit {
    DocumentInit::new().with_parser_factory(parser_factory())
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read markup: {0}")]
    Read(#[from] std::io::Error),

    #[error("Parsed tree rejected by the document: {0}")]
    Tree(#[from] DomError),
}
