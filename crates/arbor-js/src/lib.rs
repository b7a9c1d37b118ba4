//! Arbor JavaScript Bindings
//!
//! QuickJS-based script context over an Arbor [`Document`].
//!
//! Features:
//! - Console API (log, info, warn, error, debug) routed to tracing
//! - `document`, `Node`, `Element` and character data wrappers
//! - `MutationObserver` with delivery at the microtask checkpoint
//! - `DOMException` carrying the DOM error name
//!
//! [`Document`]: arbor_dom::Document

mod bindings;
mod console;
mod prelude;
mod runtime;

pub use runtime::{ScriptContext, DEFAULT_MEMORY_LIMIT};

use rquickjs::Value;

/// JavaScript value
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object,
    Array,
    Function,
}

impl JsValue {
    pub(crate) fn from_js(value: &Value<'_>) -> Self {
        if value.is_undefined() {
            Self::Undefined
        } else if value.is_null() {
            Self::Null
        } else if let Some(b) = value.as_bool() {
            Self::Bool(b)
        } else if let Some(n) = value.as_int() {
            Self::Number(f64::from(n))
        } else if let Some(n) = value.as_float() {
            Self::Number(n)
        } else if let Some(s) = value.as_string() {
            s.to_string().map(Self::String).unwrap_or(Self::Undefined)
        } else if value.is_array() {
            Self::Array
        } else if value.is_function() {
            Self::Function
        } else {
            Self::Object
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// JavaScript error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JsError {
    #[error("JavaScript error: {0}")]
    Runtime(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Uncaught exception; `name` is the constructor name or DOMException name
    #[error("{name}: {message}")]
    Exception { name: String, message: String },
}

impl JsError {
    /// Exception name, if the script threw
    pub fn exception_name(&self) -> Option<&str> {
        match self {
            Self::Exception { name, .. } => Some(name),
            Self::Syntax(_) => Some("SyntaxError"),
            Self::Runtime(_) => None,
        }
    }
}
