//! DOM Bindings for JavaScript
//!
//! Natives speak in wrapper handles (plain numbers). The prelude owns the
//! handle -> object cache, so every handle a native returns must reach
//! `wrap()` on the JS side; a handle that is dropped on the floor keeps its
//! node alive for the lifetime of the context.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use arbor_dom::{
    Document, DomError, DomResult, MutationObserverInit, MutationRecord, NodeId, ObserverId,
    WrapperClient, WrapperId,
};
use rquickjs::function::IntoJsFunc;
use rquickjs::{Ctx, Exception, Function, Object, Value};

/// Hidden global that builds a `DOMException(message, name)`
pub(crate) const MAKE_DOM_EXCEPTION: &str = "__arbor_make_dom_exception";

/// Hidden global the checkpoint calls with `(observerId, rawRecords)`
pub(crate) const DELIVER_RECORDS: &str = "__arbor_deliver_records";

/// Handles this runtime holds, installed as the document's wrapper client
#[derive(Debug, Default)]
pub(crate) struct WrapperTracker {
    handles: RefCell<BTreeSet<WrapperId>>,
    invalidated: Cell<usize>,
}

impl WrapperTracker {
    pub(crate) fn outstanding(&self) -> usize {
        self.handles.borrow().len()
    }

    pub(crate) fn invalidated(&self) -> usize {
        self.invalidated.get()
    }

    fn released(&self, handle: WrapperId) {
        self.handles.borrow_mut().remove(&handle);
    }

    pub(crate) fn take_all(&self) -> Vec<WrapperId> {
        std::mem::take(&mut *self.handles.borrow_mut()).into_iter().collect()
    }
}

impl WrapperClient for WrapperTracker {
    fn register_wrapper(&self, node: NodeId, handle: WrapperId) {
        tracing::trace!(%node, handle = handle.as_u64(), "Script wrapper registered");
        self.handles.borrow_mut().insert(handle);
    }

    fn invalidate_wrapper(&self, handle: WrapperId) {
        // Stays outstanding until the object is collected and released
        tracing::trace!(handle = handle.as_u64(), "Script wrapper invalidated");
        self.invalidated.set(self.invalidated.get() + 1);
    }
}

/// Shared access to the document from native functions
#[derive(Clone)]
pub(crate) struct DomBridge {
    document: Rc<RefCell<Document>>,
    wrappers: Rc<WrapperTracker>,
}

impl DomBridge {
    pub(crate) fn new(document: Rc<RefCell<Document>>, wrappers: Rc<WrapperTracker>) -> Self {
        Self { document, wrappers }
    }

    /// Run `f` against the document, turning a `DomError` into a thrown
    /// `DOMException` once the borrow is released
    fn with<'js, R>(
        &self,
        ctx: &Ctx<'js>,
        f: impl FnOnce(&mut Document) -> DomResult<R>,
    ) -> rquickjs::Result<R> {
        let result = {
            let Ok(mut doc) = self.document.try_borrow_mut() else {
                return Err(Exception::throw_message(
                    ctx,
                    "document is borrowed by the embedder during script execution",
                ));
            };
            f(&mut doc)
        };
        result.map_err(|err| throw_dom_error(ctx, &err))
    }
}

/// Throw `err` as a `DOMException` carrying the error kind as its name
pub(crate) fn throw_dom_error<'js>(ctx: &Ctx<'js>, err: &DomError) -> rquickjs::Error {
    let exception = ctx
        .globals()
        .get::<_, Function<'js>>(MAKE_DOM_EXCEPTION)
        .and_then(|make| make.call::<_, Value<'js>>((err.name(), err.message())));
    match exception {
        Ok(exception) => ctx.throw(exception),
        Err(err) => err,
    }
}

fn node(doc: &Document, handle: f64) -> DomResult<NodeId> {
    doc.node_for(WrapperId::from_raw(handle as u64))
}

fn handle(doc: &mut Document, node: NodeId) -> DomResult<f64> {
    Ok(doc.wrapper_for(node)?.as_u64() as f64)
}

fn optional_handle(doc: &mut Document, node: Option<NodeId>) -> DomResult<Option<f64>> {
    node.map(|n| handle(doc, n)).transpose()
}

fn handles(doc: &mut Document, nodes: impl IntoIterator<Item = NodeId>) -> DomResult<Vec<f64>> {
    nodes.into_iter().map(|n| handle(doc, n)).collect()
}

fn observer(id: f64) -> ObserverId {
    ObserverId::from_raw(id as u64)
}

fn set_native<'js, F, P>(
    ctx: &Ctx<'js>,
    dom: &Object<'js>,
    name: &str,
    f: F,
) -> rquickjs::Result<()>
where
    F: IntoJsFunc<'js, P> + 'js,
{
    dom.set(name, Function::new(ctx.clone(), f)?.with_name(name)?)
}

/// Mutation record with its nodes resolved to wrapper handles
///
/// Nodes destroyed since the record was queued (by `open()`) resolve to
/// `null` or drop out of the node lists.
pub(crate) struct RecordHandles {
    kind: &'static str,
    target: Option<f64>,
    added: Vec<f64>,
    removed: Vec<f64>,
    previous_sibling: Option<f64>,
    next_sibling: Option<f64>,
    attribute_name: Option<String>,
    attribute_namespace: Option<String>,
    old_value: Option<String>,
}

impl RecordHandles {
    pub(crate) fn resolve(doc: &mut Document, record: &MutationRecord) -> Self {
        let mut lookup = |n: NodeId| doc.wrapper_for(n).ok().map(|h| h.as_u64() as f64);
        Self {
            kind: record.mutation_type.as_str(),
            target: lookup(record.target),
            added: record.added_nodes.iter().filter_map(|&n| lookup(n)).collect(),
            removed: record.removed_nodes.iter().filter_map(|&n| lookup(n)).collect(),
            previous_sibling: record.previous_sibling.and_then(&mut lookup),
            next_sibling: record.next_sibling.and_then(&mut lookup),
            attribute_name: record.attribute_name.clone(),
            attribute_namespace: record.attribute_namespace.clone(),
            old_value: record.old_value.clone(),
        }
    }

    pub(crate) fn into_object<'js>(self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let obj = Object::new(ctx.clone())?;
        obj.set("type", self.kind)?;
        obj.set("target", self.target)?;
        obj.set("addedNodes", self.added)?;
        obj.set("removedNodes", self.removed)?;
        obj.set("previousSibling", self.previous_sibling)?;
        obj.set("nextSibling", self.next_sibling)?;
        obj.set("attributeName", self.attribute_name)?;
        obj.set("attributeNamespace", self.attribute_namespace)?;
        obj.set("oldValue", self.old_value)?;
        Ok(obj)
    }
}

fn observer_options(options: &Object<'_>) -> rquickjs::Result<MutationObserverInit> {
    let flag = |key: &str| -> rquickjs::Result<bool> {
        Ok(options.get::<_, Option<bool>>(key)?.unwrap_or(false))
    };
    Ok(MutationObserverInit {
        child_list: flag("childList")?,
        attributes: flag("attributes")?,
        character_data: flag("characterData")?,
        subtree: flag("subtree")?,
        attribute_old_value: flag("attributeOldValue")?,
        character_data_old_value: flag("characterDataOldValue")?,
        attribute_filter: options.get::<_, Option<Vec<String>>>("attributeFilter")?,
    })
}

/// Build the natives object handed to the prelude
pub(crate) fn install_dom<'js>(
    ctx: &Ctx<'js>,
    bridge: &DomBridge,
) -> rquickjs::Result<Object<'js>> {
    let dom = Object::new(ctx.clone())?;
    install_document_natives(ctx, &dom, bridge)?;
    install_node_natives(ctx, &dom, bridge)?;
    install_element_natives(ctx, &dom, bridge)?;
    install_observer_natives(ctx, &dom, bridge)?;
    Ok(dom)
}

fn install_document_natives<'js>(
    ctx: &Ctx<'js>,
    dom: &Object<'js>,
    bridge: &DomBridge,
) -> rquickjs::Result<()> {
    let b = bridge.clone();
    set_native(ctx, dom, "documentHandle", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| {
            let root = doc.root();
            handle(doc, root)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "createElement", move |ctx: Ctx<'js>, tag: String| {
        b.with(&ctx, |doc| {
            let id = doc.create_element(&tag)?;
            handle(doc, id)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "createTextNode", move |ctx: Ctx<'js>, data: String| {
        b.with(&ctx, |doc| {
            let id = doc.create_text_node(&data);
            handle(doc, id)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "createComment", move |ctx: Ctx<'js>, data: String| {
        b.with(&ctx, |doc| {
            let id = doc.create_comment(&data);
            handle(doc, id)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "createDocumentFragment", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| {
            let id = doc.create_document_fragment();
            handle(doc, id)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "getElementById", move |ctx: Ctx<'js>, id: String| {
        b.with(&ctx, |doc| {
            let found = doc.get_element_by_id(&id);
            optional_handle(doc, found)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "getElementsByTagName", move |ctx: Ctx<'js>, root: f64, name: String| {
        b.with(&ctx, |doc| {
            let root = node(doc, root)?;
            let found = doc.get_elements_by_tag_name(root, &name);
            handles(doc, found.iter().copied())
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "getElementsByClassName", move |ctx: Ctx<'js>, root: f64, names: String| {
        b.with(&ctx, |doc| {
            let root = node(doc, root)?;
            let found = doc.get_elements_by_class_name(root, &names);
            handles(doc, found.iter().copied())
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "getElementsByName", move |ctx: Ctx<'js>, name: String| {
        b.with(&ctx, |doc| {
            let found = doc.get_elements_by_name(&name);
            handles(doc, found.iter().copied())
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "open", move |ctx: Ctx<'js>| b.with(&ctx, Document::open))?;

    let b = bridge.clone();
    set_native(ctx, dom, "write", move |ctx: Ctx<'js>, text: String| {
        b.with(&ctx, |doc| doc.write(&text))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "writeln", move |ctx: Ctx<'js>, text: String| {
        b.with(&ctx, |doc| doc.writeln(&text))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "close", move |ctx: Ctx<'js>| b.with(&ctx, Document::close))?;

    let b = bridge.clone();
    set_native(ctx, dom, "title", move |ctx: Ctx<'js>| b.with(&ctx, |doc| Ok(doc.title())))?;

    let b = bridge.clone();
    set_native(ctx, dom, "setTitle", move |ctx: Ctx<'js>, title: String| {
        b.with(&ctx, |doc| doc.set_title(&title))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "url", move |ctx: Ctx<'js>| b.with(&ctx, |doc| Ok(doc.url())))?;

    let b = bridge.clone();
    set_native(ctx, dom, "readyState", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| Ok(doc.ready_state().as_str()))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "referrer", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| Ok(doc.referrer().to_string()))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "cookie", move |ctx: Ctx<'js>| b.with(&ctx, |doc| doc.cookie()))?;

    let b = bridge.clone();
    set_native(ctx, dom, "setCookie", move |ctx: Ctx<'js>, cookie: String| {
        b.with(&ctx, |doc| doc.set_cookie(&cookie))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "domain", move |ctx: Ctx<'js>| b.with(&ctx, |doc| Ok(doc.domain())))?;

    let b = bridge.clone();
    set_native(ctx, dom, "characterSet", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| Ok(doc.character_set().to_string()))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "lastModified", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| Ok(doc.last_modified()))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "documentElement", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| {
            let element = doc.document_element();
            optional_handle(doc, element)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "head", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| {
            let head = doc.head();
            optional_handle(doc, head)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "body", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| {
            let body = doc.body();
            optional_handle(doc, body)
        })
    })?;

    Ok(())
}

fn install_node_natives<'js>(
    ctx: &Ctx<'js>,
    dom: &Object<'js>,
    bridge: &DomBridge,
) -> rquickjs::Result<()> {
    let b = bridge.clone();
    set_native(ctx, dom, "nodeType", move |ctx: Ctx<'js>, h: f64| {
        b.with(&ctx, |doc| Ok(doc.node(node(doc, h)?)?.node_type() as u8 as i32))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "nodeName", move |ctx: Ctx<'js>, h: f64| {
        b.with(&ctx, |doc| Ok(doc.node(node(doc, h)?)?.node_name()))
    })?;

    // Single-link navigation shares one shape
    type Link = fn(&arbor_dom::Node) -> Option<NodeId>;
    let links: [(&str, Link); 5] = [
        ("parentNode", |n| n.parent()),
        ("firstChild", |n| n.first_child()),
        ("lastChild", |n| n.last_child()),
        ("previousSibling", |n| n.previous_sibling()),
        ("nextSibling", |n| n.next_sibling()),
    ];
    for (name, link) in links {
        let b = bridge.clone();
        set_native(ctx, dom, name, move |ctx: Ctx<'js>, h: f64| {
            b.with(&ctx, |doc| {
                let target = link(doc.node(node(doc, h)?)?);
                optional_handle(doc, target)
            })
        })?;
    }

    let b = bridge.clone();
    set_native(ctx, dom, "childNodes", move |ctx: Ctx<'js>, h: f64| {
        b.with(&ctx, |doc| {
            let parent = node(doc, h)?;
            let children: Vec<NodeId> = doc.tree().children(parent).collect();
            handles(doc, children)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "isConnected", move |ctx: Ctx<'js>, h: f64| {
        b.with(&ctx, |doc| Ok(doc.node(node(doc, h)?)?.is_connected()))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "textContent", move |ctx: Ctx<'js>, h: f64| {
        b.with(&ctx, |doc| Ok(doc.text_content(node(doc, h)?)))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "setTextContent", move |ctx: Ctx<'js>, h: f64, text: String| {
        b.with(&ctx, |doc| doc.set_text_content(node(doc, h)?, &text))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "appendChild", move |ctx: Ctx<'js>, parent: f64, child: f64| {
        b.with(&ctx, |doc| {
            let (parent, child) = (node(doc, parent)?, node(doc, child)?);
            doc.append_child(parent, child).map(drop)
        })
    })?;

    let b = bridge.clone();
    set_native(
        ctx,
        dom,
        "insertBefore",
        move |ctx: Ctx<'js>, parent: f64, child: f64, reference: Option<f64>| {
            b.with(&ctx, |doc| {
                let (parent, child) = (node(doc, parent)?, node(doc, child)?);
                let reference = reference.map(|r| node(doc, r)).transpose()?;
                doc.insert_before(parent, child, reference).map(drop)
            })
        },
    )?;

    let b = bridge.clone();
    set_native(ctx, dom, "removeChild", move |ctx: Ctx<'js>, parent: f64, child: f64| {
        b.with(&ctx, |doc| {
            let (parent, child) = (node(doc, parent)?, node(doc, child)?);
            doc.remove_child(parent, child).map(drop)
        })
    })?;

    let b = bridge.clone();
    set_native(
        ctx,
        dom,
        "replaceChild",
        move |ctx: Ctx<'js>, parent: f64, child: f64, old: f64| {
            b.with(&ctx, |doc| {
                let (parent, child, old) = (node(doc, parent)?, node(doc, child)?, node(doc, old)?);
                doc.replace_child(parent, child, old).map(drop)
            })
        },
    )?;

    let b = bridge.clone();
    set_native(ctx, dom, "cloneNode", move |ctx: Ctx<'js>, h: f64, deep: bool| {
        b.with(&ctx, |doc| {
            let clone = doc.clone_node(node(doc, h)?, deep)?;
            handle(doc, clone)
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "releaseWrapper", move |ctx: Ctx<'js>, h: f64| {
        let handle = WrapperId::from_raw(h as u64);
        b.wrappers.released(handle);
        b.with(&ctx, |doc| Ok(doc.release_wrapper(handle) as f64))
    })?;

    Ok(())
}

fn install_element_natives<'js>(
    ctx: &Ctx<'js>,
    dom: &Object<'js>,
    bridge: &DomBridge,
) -> rquickjs::Result<()> {
    let b = bridge.clone();
    set_native(ctx, dom, "tagName", move |ctx: Ctx<'js>, h: f64| {
        b.with(&ctx, |doc| Ok(doc.tag_name(node(doc, h)?)))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "getAttribute", move |ctx: Ctx<'js>, h: f64, name: String| {
        b.with(&ctx, |doc| {
            let el = node(doc, h)?;
            Ok(doc.get_attribute(el, &name).map(str::to_string))
        })
    })?;

    let b = bridge.clone();
    set_native(
        ctx,
        dom,
        "setAttribute",
        move |ctx: Ctx<'js>, h: f64, name: String, value: String| {
            b.with(&ctx, |doc| doc.set_attribute(node(doc, h)?, &name, &value))
        },
    )?;

    let b = bridge.clone();
    set_native(ctx, dom, "removeAttribute", move |ctx: Ctx<'js>, h: f64, name: String| {
        b.with(&ctx, |doc| doc.remove_attribute(node(doc, h)?, &name))
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "hasAttribute", move |ctx: Ctx<'js>, h: f64, name: String| {
        b.with(&ctx, |doc| Ok(doc.has_attribute(node(doc, h)?, &name)))
    })?;

    let b = bridge.clone();
    set_native(
        ctx,
        dom,
        "toggleAttribute",
        move |ctx: Ctx<'js>, h: f64, name: String, force: Option<bool>| {
            b.with(&ctx, |doc| doc.toggle_attribute(node(doc, h)?, &name, force))
        },
    )?;

    let b = bridge.clone();
    set_native(ctx, dom, "getAttributeNames", move |ctx: Ctx<'js>, h: f64| {
        b.with(&ctx, |doc| Ok(doc.attribute_names(node(doc, h)?)))
    })?;

    Ok(())
}

fn install_observer_natives<'js>(
    ctx: &Ctx<'js>,
    dom: &Object<'js>,
    bridge: &DomBridge,
) -> rquickjs::Result<()> {
    let b = bridge.clone();
    set_native(ctx, dom, "createObserver", move |ctx: Ctx<'js>| {
        b.with(&ctx, |doc| Ok(doc.notifier_mut().create_observer(None).as_u64() as f64))
    })?;

    let b = bridge.clone();
    set_native(
        ctx,
        dom,
        "observe",
        move |ctx: Ctx<'js>, id: f64, target: f64, options: Object<'js>| {
            let options = observer_options(&options)?;
            b.with(&ctx, |doc| {
                let target = node(doc, target)?;
                doc.notifier_mut().observe(observer(id), target, options)
            })
        },
    )?;

    let b = bridge.clone();
    set_native(ctx, dom, "disconnect", move |ctx: Ctx<'js>, id: f64| {
        b.with(&ctx, |doc| {
            doc.notifier_mut().disconnect(observer(id));
            Ok(())
        })
    })?;

    let b = bridge.clone();
    set_native(ctx, dom, "takeRecords", move |ctx: Ctx<'js>, id: f64| {
        let resolved = b.with(&ctx, |doc| {
            let records = doc.notifier_mut().take_records(observer(id));
            Ok(records
                .iter()
                .map(|record| RecordHandles::resolve(doc, record))
                .collect::<Vec<_>>())
        })?;
        resolved
            .into_iter()
            .map(|record| record.into_object(&ctx))
            .collect::<rquickjs::Result<Vec<_>>>()
    })?;

    Ok(())
}
