//! Page loading tests - HTML through scripts to the document tree

use arbor_engine::dom::{Features, MemoryCookieJar};
use arbor_engine::js::JsValue;
use arbor_engine::{Config, Engine};

use std::rc::Rc;

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_load_runs_inline_scripts() {
    let engine = Engine::default();
    let page = engine
        .load_html(
            "https://example.com/",
            r#"
            <html><head><title>Before</title></head>
            <body>
                <ul id="list"></ul>
                <script>
                    const list = document.getElementById('list');
                    for (let i = 0; i < 3; i++) {
                        const li = document.createElement('li');
                        li.textContent = 'item ' + i;
                        list.appendChild(li);
                    }
                    document.title = 'After';
                </script>
                <script type="application/json">{"not": "run"}</script>
            </body></html>
            "#,
        )
        .unwrap();

    assert_eq!(page.scripts_executed(), 1);
    assert_eq!(page.script_errors(), 0);
    assert_eq!(page.title(), "After");

    let doc = page.dom();
    let list = doc.get_element_by_id("list").unwrap();
    assert_eq!(doc.tree().child_count(list), 3);
}

#[test]
fn test_failing_script_does_not_stop_later_ones() {
    let engine = Engine::default();
    let page = engine
        .load_html(
            "https://example.com/",
            "<script>missing.call()</script><script>document.body.id = 'ran'</script>",
        )
        .unwrap();
    assert_eq!(page.scripts_executed(), 2);
    assert_eq!(page.script_errors(), 1);
    assert!(page.dom().get_element_by_id("ran").is_some());
}

#[test]
fn test_scripts_disabled() {
    let engine = Engine::new(Config {
        run_scripts: false,
        ..Config::default()
    });
    let page = engine
        .load_html("https://example.com/", "<script>document.title = 'x'</script>")
        .unwrap();
    assert_eq!(page.scripts_executed(), 0);
    assert!(page.script_context().is_none());
    assert!(page.eval("1").is_err());
}

#[test]
fn test_blank_page() {
    let engine = Engine::default();
    let page = engine.blank_page().unwrap();
    assert_eq!(page.url(), "about:blank");
    assert_eq!(page.eval("document.body.tagName").unwrap(), JsValue::String("BODY".into()));

    page.eval("document.write('<h1 id=h>written</h1>'); document.close()").unwrap();
    assert!(page.dom().get_element_by_id("h").is_some());
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_document_write_disabled() {
    let engine = Engine::new(Config {
        features: Features {
            document_write: false,
            ..Features::default()
        },
        ..Config::default()
    });
    let page = engine.load_html("https://example.com/", "").unwrap();
    let err = page.eval("document.write('<p>')").unwrap_err();
    assert!(err.to_string().contains("NotSupportedError"), "{err}");
}

#[test]
fn test_script_memory_limit_is_engine_level() {
    let engine = Engine::new(Config {
        script_memory_limit: 8 * 1024 * 1024,
        ..Config::default()
    });
    assert_eq!(engine.config().features, Features::default());

    let page = engine.load_html("https://example.com/", "<p id=p></p>").unwrap();
    let tag = page.eval("document.getElementById('p').tagName").unwrap();
    assert_eq!(tag, JsValue::String("P".into()));
    assert!(page.eval("'x'.repeat(64 * 1024 * 1024).length").is_err());
}

#[test]
fn test_cookie_jar_round_trip() {
    let engine = Engine::default();
    let init = arbor_engine::dom::DocumentInit::new()
        .with_url("https://example.com/")
        .with_cookie_jar(Rc::new(MemoryCookieJar::new()));
    let page = engine.load_with_init("", init).unwrap();
    page.eval("document.cookie = 'a=1'; document.cookie = 'b=2'").unwrap();
    assert_eq!(page.eval("document.cookie").unwrap(), JsValue::String("a=1; b=2".into()));
}

// ============================================================================
// OBSERVERS AND COLLECTION
// ============================================================================

#[test]
fn test_observer_set_up_by_page_script() {
    let engine = Engine::default();
    let page = engine
        .load_html(
            "https://example.com/",
            r#"<div id=t></div><script>
                globalThis.count = 0;
                new MutationObserver((records) => { count += records.length; })
                    .observe(document.getElementById('t'), { childList: true, subtree: true });
            </script>"#,
        )
        .unwrap();

    page.eval("const t = document.getElementById('t'); t.appendChild(document.createElement('b')); t.firstChild.appendChild(document.createTextNode('x'));")
        .unwrap();
    assert_eq!(page.eval("count").unwrap(), JsValue::Number(2.0));
    assert_eq!(page.run_microtasks().unwrap(), 0);
}

#[test]
fn test_collect_garbage_without_scripts() {
    let engine = Engine::new(Config::minimal());
    let page = engine.load_html("https://example.com/", "<p>x</p>").unwrap();
    let before = page.dom().node_count();
    {
        let mut doc = page.document().borrow_mut();
        let orphan = doc.create_element("div").unwrap();
        let text = doc.create_text_node("detached");
        doc.append_child(orphan, text).unwrap();
    }
    assert_eq!(page.dom().node_count(), before + 2);
    assert_eq!(page.collect_garbage().unwrap(), 2);
    assert_eq!(page.dom().node_count(), before);
}
