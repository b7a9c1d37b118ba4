//! Console API
//!
//! `console.log/info/warn/error/debug` forward to tracing under the
//! `arbor_js::console` target.

use std::fmt::Write;

use rquickjs::function::Rest;
use rquickjs::{Ctx, Function, Object, Value};

#[derive(Debug, Clone, Copy)]
enum Level {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

const METHODS: [(&str, Level); 5] = [
    ("log", Level::Log),
    ("info", Level::Info),
    ("warn", Level::Warn),
    ("error", Level::Error),
    ("debug", Level::Debug),
];

/// Install console API into the global object
pub fn install_console<'js>(ctx: &Ctx<'js>) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;
    for (name, level) in METHODS {
        let log = Function::new(ctx.clone(), move |args: Rest<Value<'js>>| {
            log_with_level(level, &args.0);
        })?
        .with_name(name)?;
        console.set(name, log)?;
    }
    ctx.globals().set("console", console)
}

fn log_with_level(level: Level, values: &[Value]) {
    let mut output = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        format_value(&mut output, value);
    }

    match level {
        Level::Error => tracing::error!(target: "arbor_js::console", "{}", output),
        Level::Warn => tracing::warn!(target: "arbor_js::console", "{}", output),
        Level::Debug => tracing::debug!(target: "arbor_js::console", "{}", output),
        Level::Log | Level::Info => tracing::info!(target: "arbor_js::console", "{}", output),
    }
}

/// Format a JavaScript value for logging
pub(crate) fn format_value(out: &mut String, value: &Value) {
    if value.is_undefined() {
        out.push_str("undefined");
    } else if value.is_null() {
        out.push_str("null");
    } else if let Some(b) = value.as_bool() {
        write!(out, "{}", b).ok();
    } else if let Some(n) = value.as_int() {
        write!(out, "{}", n).ok();
    } else if let Some(n) = value.as_float() {
        write!(out, "{}", n).ok();
    } else if let Some(s) = value.as_string() {
        if let Ok(s) = s.to_string() {
            out.push_str(&s);
        }
    } else if value.is_array() {
        out.push_str("[Array]");
    } else if value.is_function() {
        out.push_str("[Function]");
    } else if let Some(name) = value
        .as_object()
        .and_then(|obj| obj.get::<_, Object>("constructor").ok())
        .and_then(|ctor| ctor.get::<_, String>("name").ok())
        .filter(|name| !name.is_empty() && name != "Object")
    {
        write!(out, "[{}]", name).ok();
    } else if value.is_object() {
        out.push_str("[Object]");
    } else {
        out.push_str("[unknown]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    fn formatted(source: &str) -> String {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let value: Value = ctx.eval(source).unwrap();
            let mut out = String::new();
            format_value(&mut out, &value);
            out
        })
    }

    #[test]
    fn test_console_levels() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        context.with(|ctx| {
            install_console(&ctx).unwrap();
            let _: Value = ctx
                .eval("console.log('a', 1, true); console.info('info'); console.warn('warn'); console.error('error'); console.debug('debug')")
                .unwrap();
        });
    }

    #[test]
    fn test_format_primitives() {
        assert_eq!(formatted("undefined"), "undefined");
        assert_eq!(formatted("null"), "null");
        assert_eq!(formatted("42"), "42");
        assert_eq!(formatted("1.5"), "1.5");
        assert_eq!(formatted("'text'"), "text");
    }

    #[test]
    fn test_format_objects() {
        assert_eq!(formatted("[1, 2]"), "[Array]");
        assert_eq!(formatted("(function () {})"), "[Function]");
        assert_eq!(formatted("({})"), "[Object]");
        assert_eq!(formatted("class Widget {}; new Widget()"), "[Widget]");
    }
}
