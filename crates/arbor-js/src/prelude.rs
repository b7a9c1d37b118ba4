//! Script-side half of the DOM bindings
//!
//! Evaluated once per context as a function expression and called with the
//! natives object. Every handle a native hands back goes through `wrap()`,
//! which keeps at most one object per handle alive and returns the handle to
//! the document from a `FinalizationRegistry` once that object is collected.

pub(crate) const DOM_PRELUDE: &str = r#"
(function (dom) {
    "use strict";

    const HANDLE = Symbol("arbor.handle");
    const OBSERVER = Symbol("arbor.observer");
    const CALLBACK = Symbol("arbor.callback");

    class DOMException extends Error {
        constructor(message = "", name = "Error") {
            super(message);
            Object.defineProperty(this, "name", { value: String(name), configurable: true });
        }
    }

    // handle -> { ref, gen }
    const cache = new Map();
    let generation = 0;
    const registry = new FinalizationRegistry(({ handle, gen }) => {
        const entry = cache.get(handle);
        if (entry === undefined || entry.gen !== gen) {
            return;
        }
        cache.delete(handle);
        dom.releaseWrapper(handle);
    });

    let constructing = false;
    function illegalConstructor() {
        if (!constructing) {
            throw new TypeError("Illegal constructor");
        }
    }

    function wrap(handle) {
        if (handle === null || handle === undefined) {
            return null;
        }
        const entry = cache.get(handle);
        if (entry !== undefined) {
            const existing = entry.ref.deref();
            if (existing !== undefined) {
                return existing;
            }
        }
        const Kind = classFor(dom.nodeType(handle));
        let node;
        constructing = true;
        try {
            node = new Kind();
        } finally {
            constructing = false;
        }
        Object.defineProperty(node, HANDLE, { value: handle });
        const gen = ++generation;
        cache.set(handle, { ref: new WeakRef(node), gen });
        registry.register(node, { handle, gen });
        return node;
    }

    function wrapAll(handles) {
        return Object.freeze(handles.map(wrap));
    }

    function unwrap(node) {
        if (node === null || typeof node !== "object" || !(HANDLE in node)) {
            throw new TypeError("parameter is not of type 'Node'");
        }
        return node[HANDLE];
    }

    function text(args) {
        return args.map(String).join("");
    }

    class Node {
        constructor() {
            illegalConstructor();
        }

        get nodeType() { return dom.nodeType(this[HANDLE]); }
        get nodeName() { return dom.nodeName(this[HANDLE]); }
        get ownerDocument() { return this.nodeType === Node.DOCUMENT_NODE ? null : document; }
        get parentNode() { return wrap(dom.parentNode(this[HANDLE])); }
        get parentElement() {
            const parent = this.parentNode;
            return parent !== null && parent.nodeType === Node.ELEMENT_NODE ? parent : null;
        }
        get firstChild() { return wrap(dom.firstChild(this[HANDLE])); }
        get lastChild() { return wrap(dom.lastChild(this[HANDLE])); }
        get previousSibling() { return wrap(dom.previousSibling(this[HANDLE])); }
        get nextSibling() { return wrap(dom.nextSibling(this[HANDLE])); }
        get childNodes() { return wrapAll(dom.childNodes(this[HANDLE])); }
        get isConnected() { return dom.isConnected(this[HANDLE]); }
        get textContent() { return dom.textContent(this[HANDLE]); }
        set textContent(value) {
            dom.setTextContent(this[HANDLE], value === null ? "" : String(value));
        }

        hasChildNodes() { return dom.firstChild(this[HANDLE]) !== null; }

        contains(other) {
            for (let node = other; node !== null && node !== undefined; node = node.parentNode) {
                if (node === this) {
                    return true;
                }
            }
            return false;
        }

        appendChild(child) {
            dom.appendChild(this[HANDLE], unwrap(child));
            return child;
        }

        insertBefore(child, reference) {
            const ref = reference === null || reference === undefined ? undefined : unwrap(reference);
            dom.insertBefore(this[HANDLE], unwrap(child), ref);
            return child;
        }

        removeChild(child) {
            dom.removeChild(this[HANDLE], unwrap(child));
            return child;
        }

        replaceChild(child, old) {
            dom.replaceChild(this[HANDLE], unwrap(child), unwrap(old));
            return old;
        }

        cloneNode(deep = false) {
            return wrap(dom.cloneNode(this[HANDLE], Boolean(deep)));
        }
    }

    const NODE_TYPES = {
        ELEMENT_NODE: 1,
        TEXT_NODE: 3,
        PROCESSING_INSTRUCTION_NODE: 7,
        COMMENT_NODE: 8,
        DOCUMENT_NODE: 9,
        DOCUMENT_TYPE_NODE: 10,
        DOCUMENT_FRAGMENT_NODE: 11,
    };
    for (const [key, value] of Object.entries(NODE_TYPES)) {
        Object.defineProperty(Node, key, { value });
        Object.defineProperty(Node.prototype, key, { value });
    }

    class Element extends Node {
        get tagName() { return dom.tagName(this[HANDLE]); }
        get localName() { return this.tagName.toLowerCase(); }
        get id() { return dom.getAttribute(this[HANDLE], "id") ?? ""; }
        set id(value) { dom.setAttribute(this[HANDLE], "id", String(value)); }
        get className() { return dom.getAttribute(this[HANDLE], "class") ?? ""; }
        set className(value) { dom.setAttribute(this[HANDLE], "class", String(value)); }
        get children() {
            return Object.freeze(this.childNodes.filter((n) => n.nodeType === Node.ELEMENT_NODE));
        }

        getAttribute(name) { return dom.getAttribute(this[HANDLE], String(name)); }
        setAttribute(name, value) { dom.setAttribute(this[HANDLE], String(name), String(value)); }
        removeAttribute(name) { dom.removeAttribute(this[HANDLE], String(name)); }
        hasAttribute(name) { return dom.hasAttribute(this[HANDLE], String(name)); }
        toggleAttribute(name, force) {
            return dom.toggleAttribute(this[HANDLE], String(name), force === undefined ? undefined : Boolean(force));
        }
        getAttributeNames() { return dom.getAttributeNames(this[HANDLE]); }

        getElementsByTagName(name) {
            return wrapAll(dom.getElementsByTagName(this[HANDLE], String(name)));
        }
        getElementsByClassName(names) {
            return wrapAll(dom.getElementsByClassName(this[HANDLE], String(names)));
        }
    }

    class CharacterData extends Node {
        get data() { return dom.textContent(this[HANDLE]); }
        set data(value) { dom.setTextContent(this[HANDLE], String(value)); }
        get length() { return this.data.length; }
    }

    class Text extends CharacterData {}
    class Comment extends CharacterData {}
    class ProcessingInstruction extends CharacterData {
        get target() { return this.nodeName; }
    }

    class DocumentType extends Node {
        get name() { return this.nodeName; }
    }

    class DocumentFragment extends Node {}

    class Document extends Node {
        get documentElement() { return wrap(dom.documentElement()); }
        get head() { return wrap(dom.head()); }
        get body() { return wrap(dom.body()); }
        get title() { return dom.title(); }
        set title(value) { dom.setTitle(String(value)); }
        get URL() { return dom.url(); }
        get documentURI() { return dom.url(); }
        get referrer() { return dom.referrer(); }
        get readyState() { return dom.readyState(); }
        get cookie() { return dom.cookie(); }
        set cookie(value) { dom.setCookie(String(value)); }
        get domain() { return dom.domain(); }
        get characterSet() { return dom.characterSet(); }
        get lastModified() { return dom.lastModified(); }

        createElement(tag) { return wrap(dom.createElement(String(tag))); }
        createTextNode(data) { return wrap(dom.createTextNode(String(data))); }
        createComment(data) { return wrap(dom.createComment(String(data))); }
        createDocumentFragment() { return wrap(dom.createDocumentFragment()); }

        getElementById(id) { return wrap(dom.getElementById(String(id))); }
        getElementsByTagName(name) {
            return wrapAll(dom.getElementsByTagName(this[HANDLE], String(name)));
        }
        getElementsByClassName(names) {
            return wrapAll(dom.getElementsByClassName(this[HANDLE], String(names)));
        }
        getElementsByName(name) { return wrapAll(dom.getElementsByName(String(name))); }

        open() {
            dom.open();
            return this;
        }
        write(...args) { dom.write(text(args)); }
        writeln(...args) { dom.writeln(text(args)); }
        close() { dom.close(); }
    }

    function classFor(nodeType) {
        switch (nodeType) {
            case 1: return Element;
            case 3: return Text;
            case 7: return ProcessingInstruction;
            case 8: return Comment;
            case 9: return Document;
            case 10: return DocumentType;
            default: return DocumentFragment;
        }
    }

    function toRecord(raw) {
        return Object.freeze({
            type: raw.type,
            target: wrap(raw.target),
            addedNodes: wrapAll(raw.addedNodes),
            removedNodes: wrapAll(raw.removedNodes),
            previousSibling: wrap(raw.previousSibling),
            nextSibling: wrap(raw.nextSibling),
            attributeName: raw.attributeName ?? null,
            attributeNamespace: raw.attributeNamespace ?? null,
            oldValue: raw.oldValue ?? null,
        });
    }

    // Observers stay reachable for the lifetime of the context
    const observers = new Map();

    class MutationObserver {
        constructor(callback) {
            if (typeof callback !== "function") {
                throw new TypeError("MutationObserver callback is not a function");
            }
            const id = dom.createObserver();
            Object.defineProperty(this, OBSERVER, { value: id });
            Object.defineProperty(this, CALLBACK, { value: callback });
            observers.set(id, this);
        }

        observe(target, options = {}) {
            dom.observe(this[OBSERVER], unwrap(target), options);
        }

        disconnect() { dom.disconnect(this[OBSERVER]); }

        takeRecords() { return dom.takeRecords(this[OBSERVER]).map(toRecord); }
    }

    function hidden(name, value) {
        Object.defineProperty(globalThis, name, { value, configurable: false, enumerable: false });
    }

    hidden("__arbor_deliver_records", function (id, raws) {
        const observer = observers.get(id);
        if (observer === undefined) {
            return;
        }
        const records = raws.map(toRecord);
        observer[CALLBACK].call(observer, records, observer);
    });

    hidden("__arbor_make_dom_exception", function (name, message) {
        return new DOMException(message, name);
    });

    const document = wrap(dom.documentHandle());

    Object.assign(globalThis, {
        DOMException,
        Node,
        Element,
        HTMLElement: Element,
        CharacterData,
        Text,
        Comment,
        ProcessingInstruction,
        DocumentType,
        DocumentFragment,
        Document,
        MutationObserver,
    });
    Object.defineProperty(globalThis, "document", {
        get() { return document; },
        enumerable: true,
        configurable: true,
    });
})
"#;
