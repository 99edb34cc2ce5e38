//! Cycle-safe JSON rendering of field values
//!
//! [`SafeCycles`] remembers every object it has visited during one traversal
//! and substitutes `"[Circular]"` for any object it meets again. The seen list
//! is a single flat list for the whole traversal, not one per ancestor chain,
//! so two independent references to one shared object also collapse to
//! `"[Circular]"`. Keep it that way: consumers rely on this output.

use super::field_value::{ErrorValue, FieldValue, Fields};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

pub const CIRCULAR: &str = "[Circular]";

/// Stateful replacer for one serialization traversal.
#[derive(Debug, Default)]
pub struct SafeCycles {
    seen: Vec<usize>,
}

/// Create a fresh replacer.
pub fn safe_cycles() -> SafeCycles {
    SafeCycles::new()
}

impl SafeCycles {
    pub fn new() -> Self {
        Self { seen: Vec::new() }
    }

    /// The replacer step: `Some("[Circular]")` for an object already seen in
    /// this traversal, otherwise records the object and returns `None`.
    pub fn replace(&mut self, value: &FieldValue) -> Option<&'static str> {
        let FieldValue::Object(obj) = value else {
            return None;
        };
        let id = obj.identity() as usize;
        if self.seen.contains(&id) {
            return Some(CIRCULAR);
        }
        self.seen.push(id);
        None
    }

    pub fn to_json(&mut self, value: &FieldValue) -> Value {
        if let Some(token) = self.replace(value) {
            return Value::String(token.to_string());
        }
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Number((*i).into()),
            FieldValue::Float(f) => float_to_json(*f),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Time(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FieldValue::Array(items) => Value::Array(items.iter().map(|v| self.to_json(v)).collect()),
            FieldValue::Object(obj) => self.fields_to_json(&obj.snapshot()),
            FieldValue::Error(err) => self.error_to_json(err),
            FieldValue::Lazy(lazy) => self.to_json(&lazy.evaluate()),
        }
    }

    pub fn fields_to_json(&mut self, fields: &Fields) -> Value {
        let mut map = Map::with_capacity(fields.len());
        for (key, value) in fields {
            map.insert(key.clone(), self.to_json(value));
        }
        Value::Object(map)
    }

    pub fn stringify(&mut self, value: &FieldValue) -> String {
        serde_json::to_string(&self.to_json(value)).unwrap_or_default()
    }

    fn error_to_json(&mut self, err: &ErrorValue) -> Value {
        let mut map = Map::new();
        map.insert("message".to_string(), Value::String(err.message.clone()));
        map.insert("name".to_string(), Value::String(err.name.clone()));
        if err.stack.is_some() {
            map.insert("stack".to_string(), Value::String(err.full_stack()));
        }
        if let Some(code) = &err.code {
            map.insert("code".to_string(), Value::String(code.clone()));
        }
        if let Some(signal) = &err.signal {
            map.insert("signal".to_string(), Value::String(signal.clone()));
        }
        for (key, value) in &err.properties {
            map.insert(key.clone(), self.to_json(value));
        }
        Value::Object(map)
    }
}

/// Non-finite floats render as `null`.
fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// A true cycle was found by [`to_json_strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleError;

/// Convert without a replacer: shared objects are rendered every time they
/// occur, and an object nested inside itself is an error.
pub fn to_json_strict(value: &FieldValue) -> Result<Value, CycleError> {
    let mut ancestors = Vec::new();
    strict(value, &mut ancestors)
}

fn strict(value: &FieldValue, ancestors: &mut Vec<usize>) -> Result<Value, CycleError> {
    match value {
        FieldValue::Object(obj) => {
            let id = obj.identity() as usize;
            if ancestors.contains(&id) {
                return Err(CycleError);
            }
            ancestors.push(id);
            let mut map = Map::new();
            for (key, item) in obj.snapshot() {
                map.insert(key, strict(&item, ancestors)?);
            }
            ancestors.pop();
            Ok(Value::Object(map))
        }
        FieldValue::Array(items) => items
            .iter()
            .map(|item| strict(item, ancestors))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        FieldValue::Lazy(lazy) => strict(&lazy.evaluate(), ancestors),
        other => Ok(SafeCycles::new().to_json(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field_value::FieldObject;

    #[test]
    fn test_self_reference_becomes_circular() {
        let obj = FieldObject::new().with_field("name", "loop");
        obj.insert("me", obj.clone());

        let json = safe_cycles().stringify(&FieldValue::Object(obj));
        assert_eq!(json, r#"{"name":"loop","me":"[Circular]"}"#);
    }

    #[test]
    fn test_shared_reference_also_collapses() {
        let shared = FieldObject::new().with_field("id", 1);
        let root = FieldObject::new()
            .with_field("a", shared.clone())
            .with_field("b", shared);

        let json = safe_cycles().to_json(&FieldValue::Object(root));
        assert_eq!(json["a"]["id"], 1);
        assert_eq!(json["b"], CIRCULAR);
    }

    #[test]
    fn test_strict_allows_shared_but_rejects_cycles() {
        let shared = FieldObject::new().with_field("id", 1);
        let root = FieldObject::new()
            .with_field("a", shared.clone())
            .with_field("b", shared);
        let json = to_json_strict(&FieldValue::Object(root.clone())).unwrap();
        assert_eq!(json["b"]["id"], 1);

        root.insert("self", root.clone());
        assert_eq!(to_json_strict(&FieldValue::Object(root)), Err(CycleError));
    }

    #[test]
    fn test_scalars() {
        let mut replacer = SafeCycles::new();
        assert_eq!(replacer.to_json(&FieldValue::Float(f64::NAN)), Value::Null);
        assert_eq!(replacer.to_json(&FieldValue::Int(3)), Value::from(3));
        assert_eq!(replacer.replace(&FieldValue::from("text")), None);
    }
}
