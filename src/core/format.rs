//! printf-style message formatting
//!
//! `format` understands `%s`, `%d`, `%j` and `%%`. Specifiers with no
//! argument left are kept verbatim; arguments with no specifier left are
//! appended, separated by single spaces. When the first argument is not a
//! string, every argument is inspected and joined with spaces.

use super::field_value::FieldValue;
use super::safe_cycles::{to_json_strict, CIRCULAR};
use chrono::SecondsFormat;

pub fn format(args: &[FieldValue]) -> String {
    let Some((first, rest)) = args.split_first() else {
        return String::new();
    };
    let fmt = match first.clone().resolve() {
        FieldValue::String(fmt) => fmt,
        other => {
            let mut parts = Vec::with_capacity(args.len());
            parts.push(inspect(&other));
            parts.extend(rest.iter().map(inspect));
            return parts.join(" ");
        }
    };

    let mut out = String::with_capacity(fmt.len());
    let mut next = 0;
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let spec = match chars.peek() {
            Some(&s @ ('s' | 'd' | 'j' | '%')) => s,
            _ => {
                out.push('%');
                continue;
            }
        };
        chars.next();
        if spec == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = rest.get(next) else {
            out.push('%');
            out.push(spec);
            continue;
        };
        next += 1;
        let arg = arg.clone().resolve();
        match spec {
            's' => out.push_str(&to_js_string(&arg)),
            'd' => out.push_str(&number_to_string(to_js_number(&arg))),
            _ => match to_json_strict(&arg) {
                Ok(json) => out.push_str(&serde_json::to_string(&json).unwrap_or_default()),
                Err(_) => out.push_str(CIRCULAR),
            },
        }
    }

    for arg in &rest[next.min(rest.len())..] {
        let arg = arg.clone().resolve();
        out.push(' ');
        match arg {
            FieldValue::Object(_) | FieldValue::Array(_) | FieldValue::Error(_) | FieldValue::Time(_) => {
                out.push_str(&inspect(&arg))
            }
            scalar => out.push_str(&to_js_string(&scalar)),
        }
    }
    out
}

/// Render a value for display: objects as JSON, arrays as `[ a, b ]`,
/// strings quoted, other scalars as-is.
pub fn inspect(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_string(),
        FieldValue::Array(items) => {
            let items: Vec<String> = items.iter().map(inspect).collect();
            format!("[ {} ]", items.join(", "))
        }
        FieldValue::Object(_) | FieldValue::Error(_) => value.to_json_value().to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Float(f) => number_to_string(*f),
        FieldValue::Lazy(lazy) => inspect(&lazy.evaluate()),
        FieldValue::String(s) => format!("'{}'", s),
        FieldValue::Time(_) => format!("\"{}\"", to_js_string(value)),
    }
}

/// String conversion used by `%s` and trailing scalar arguments.
pub fn to_js_string(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Float(f) => number_to_string(*f),
        FieldValue::String(s) => s.clone(),
        FieldValue::Array(items) => items
            .iter()
            .map(|item| match item {
                FieldValue::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        FieldValue::Object(_) => "[object Object]".to_string(),
        FieldValue::Error(err) => err.to_string(),
        FieldValue::Time(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        FieldValue::Lazy(lazy) => to_js_string(&lazy.evaluate()),
    }
}

/// Numeric conversion used by `%d`.
pub fn to_js_number(value: &FieldValue) -> f64 {
    match value {
        FieldValue::Null => 0.0,
        FieldValue::Bool(b) => f64::from(u8::from(*b)),
        FieldValue::Int(i) => *i as f64,
        FieldValue::Float(f) => *f,
        FieldValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        FieldValue::Array(items) => match items.as_slice() {
            [] => 0.0,
            [only] => to_js_number(only),
            _ => f64::NAN,
        },
        FieldValue::Time(t) => t.timestamp_millis() as f64,
        FieldValue::Lazy(lazy) => to_js_number(&lazy.evaluate()),
        FieldValue::Object(_) | FieldValue::Error(_) => f64::NAN,
    }
}

/// Integral values print without a fractional part.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
