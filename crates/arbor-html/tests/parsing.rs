//! Parsing tests for arbor-html
//!
//! Malformed input, attribute sharing between parsed elements, and the
//! `open()/write()/close()` path through the HTML parser factory.

use std::cell::RefCell;
use std::rc::Rc;

use arbor_dom::{
    CallbackError, Document, DocumentParser, DomError, EngineState, Features, HostErrorChannel,
    NodeType, ParsingState,
};
use arbor_html::{HtmlDocumentParser, HtmlParser, html_document_init};

fn parser() -> HtmlParser {
    HtmlParser::new(Rc::new(EngineState::default()))
}

// ============================================================================
// DOCUMENT STRUCTURE
// ============================================================================

#[test]
fn test_parse_minimal_html() {
    let doc = parser().parse("").unwrap();
    assert!(doc.document_element().is_some(), "Even empty HTML gets an html element");
    assert!(doc.body().is_some());
}

#[test]
fn test_parse_doctype_and_comment() {
    let doc = parser()
        .parse("<!DOCTYPE html><!-- top --><html><body></body></html>")
        .unwrap();
    let kinds: Vec<NodeType> = doc
        .tree()
        .children(doc.root())
        .map(|id| doc.node_type(id).unwrap())
        .collect();
    assert_eq!(kinds, vec![NodeType::DocumentType, NodeType::Comment, NodeType::Element]);
}

#[test]
fn test_parse_nested_structure() {
    let html = r#"
        <html>
            <head>
                <title>Test Page</title>
                <meta charset="utf-8">
            </head>
            <body>
                <div id="container">
                    <h1>Welcome</h1>
                    <p class="intro lead">This is a test.</p>
                    <ul>
                        <li>Item 1</li>
                        <li>Item 2</li>
                        <li>Item 3</li>
                    </ul>
                </div>
            </body>
        </html>
    "#;

    let mut doc = parser().parse(html).unwrap();
    assert_eq!(doc.title(), "Test Page");

    let container = doc.get_element_by_id("container").unwrap();
    assert_eq!(doc.tag_name(container).as_deref(), Some("DIV"));
    assert_eq!(doc.get_elements_by_tag_name(container, "li").len(), 3);

    let intro = doc.get_elements_by_class_name(container, "lead");
    assert_eq!(intro.len(), 1);
    assert_eq!(doc.class_list(intro[0]), vec!["intro", "lead"]);
}

#[test]
fn test_parse_malformed_html() {
    let html = r#"
        <div>
            <p>Unclosed paragraph
            <span id="s">Unclosed span
        </div>
    "#;
    let doc = parser().parse(html).unwrap();
    assert!(doc.get_element_by_id("s").is_some());
    assert_eq!(doc.parsing_state(), ParsingState::FinishedParsing);
}

#[test]
fn test_parse_deeply_nested_markup() {
    let doc = parser().parse(&"<div>".repeat(10_000)).unwrap();
    assert_eq!(doc.parsing_state(), ParsingState::FinishedParsing);
    assert!(doc.node_count() > 10_000, "got {} nodes", doc.node_count());

    let mut depth = 0;
    let mut cursor = doc.body().unwrap();
    while let Some(child) = doc.tree().children(cursor).next() {
        cursor = child;
        depth += 1;
    }
    assert_eq!(depth, 10_000);
    assert_eq!(doc.tag_name(cursor).as_deref(), Some("DIV"));
}

#[test]
fn test_parse_uppercase_attributes_lowercased() {
    let doc = parser().parse(r#"<input TYPE="text" Name="q">"#).unwrap();
    let mut names: Vec<String> = Vec::new();
    let body = doc.body().unwrap();
    for input in doc.tree().children(body) {
        names.extend(doc.attribute_names(input));
    }
    assert_eq!(names, vec!["type", "name"]);
}

// ============================================================================
// ATTRIBUTE SHARING
// ============================================================================

#[test]
fn test_identical_parsed_attributes_share_storage() {
    let doc = parser()
        .parse(r#"<ul><li class="row">a</li><li class="row">b</li><li class="odd">c</li></ul>"#)
        .unwrap();
    let rows: Vec<_> = doc
        .tree()
        .descendants(doc.root())
        .filter(|&id| {
            doc.get(id)
                .and_then(|n| n.as_element())
                .is_some_and(|e| e.local_name() == "li")
        })
        .collect();
    assert_eq!(rows.len(), 3);

    let a = doc.attributes(rows[0]).unwrap();
    let b = doc.attributes(rows[1]).unwrap();
    let c = doc.attributes(rows[2]).unwrap();
    assert!(a.shares_storage_with(b));
    assert!(!a.shares_storage_with(c));
}

#[test]
fn test_sharing_disabled_by_feature() {
    let engine = Rc::new(EngineState::new(Features {
        attribute_sharing: false,
        ..Features::default()
    }));
    let doc = HtmlParser::new(engine)
        .parse(r#"<p class="x"></p><p class="x"></p>"#)
        .unwrap();
    let body = doc.body().unwrap();
    let ps: Vec<_> = doc.tree().children(body).collect();
    assert!(doc.attributes(ps[0]).unwrap().is_unique());
    assert!(!doc.attributes(ps[0]).unwrap().shares_storage_with(doc.attributes(ps[1]).unwrap()));
}

// ============================================================================
// OPEN / WRITE / CLOSE
// ============================================================================

#[test]
fn test_write_replaces_document() {
    let mut doc = parser().parse("<p id=old>old</p>").unwrap();
    let old = doc.get_element_by_id("old").unwrap();
    let handle = doc.wrapper_for(old).unwrap();

    doc.open().unwrap();
    doc.write("<p id=new>").unwrap();
    doc.writeln("fresh</p>").unwrap();
    doc.close().unwrap();

    assert!(matches!(doc.node_for(handle), Err(DomError::InvalidState(_))));
    assert!(doc.get_element_by_id("old").is_none());
    let fresh = doc.get_element_by_id("new").unwrap();
    assert_eq!(doc.text_content(fresh).as_deref(), Some("fresh\n"));
    assert!(doc.load_event_fired());
}

#[test]
fn test_write_opens_implicitly() {
    let mut doc = Document::empty(Rc::new(EngineState::default()), html_document_init());
    doc.write("<title>Written</title>").unwrap();
    assert!(doc.has_active_parser());
    doc.close().unwrap();
    assert_eq!(doc.title(), "Written");
    assert!(!doc.has_active_parser());
}

#[test]
fn test_write_disabled_by_feature() {
    let engine = Rc::new(EngineState::new(Features {
        document_write: false,
        ..Features::default()
    }));
    let mut doc = Document::empty(engine, html_document_init());
    assert!(matches!(doc.write("<p>"), Err(DomError::NotSupported(_))));
}

#[derive(Default)]
struct CollectingErrors(RefCell<Vec<String>>);

impl HostErrorChannel for CollectingErrors {
    fn report_error(&self, error: &CallbackError) {
        self.0.borrow_mut().push(error.message.clone());
    }
}

#[test]
fn test_rejected_written_tree_reaches_error_channel() {
    let errors = Rc::new(CollectingErrors::default());
    let init = html_document_init().with_error_channel(errors.clone());
    let mut doc = parser().parse_with_init("<p id=kept>kept</p>", init).unwrap();
    assert!(errors.0.borrow().is_empty());

    // A second html element under the document node is a hierarchy error
    let mut written = Box::new(HtmlDocumentParser::new());
    written.append(&mut doc, "<p>again</p>");
    written.finish(&mut doc);

    let reported = errors.0.borrow();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].starts_with("document.close():"), "{}", reported[0]);
    assert!(doc.get_element_by_id("kept").is_some());
}
