//! Per-field serializers
//!
//! A serializer transforms the value of one named record field before the
//! record is finalized. Faults inside a serializer (an `Err` return or a
//! panic) are contained here: the field receives a placeholder string and a
//! warning is emitted once per field name.

use super::diagnostics::Diagnostics;
use super::field_value::{ErrorValue, FieldObject, FieldValue, Fields};
use indexmap::IndexMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Error returned by a fallible serializer.
pub type SerializerError = Box<dyn std::error::Error + Send + Sync>;

type SerializeFn = dyn Fn(&FieldValue) -> Result<FieldValue, SerializerError> + Send + Sync;

/// A field transform, cheap to clone.
#[derive(Clone)]
pub struct Serializer(Arc<SerializeFn>);

/// Field name to serializer, applied in registration order.
pub type Serializers = IndexMap<String, Serializer>;

impl Serializer {
    /// Wrap a fallible transform.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<FieldValue, SerializerError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a transform that cannot fail.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&FieldValue) -> FieldValue + Send + Sync + 'static,
    {
        Self(Arc::new(move |value: &FieldValue| Ok(f(value))))
    }

    /// Run the transform, turning both `Err` and panics into a description.
    pub fn call(&self, value: &FieldValue) -> Result<FieldValue, String> {
        match catch_unwind(AssertUnwindSafe(|| (self.0)(value))) {
            Ok(Ok(serialized)) => Ok(serialized),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic_info) => Err(panic_message(panic_info.as_ref())),
        }
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Serializer(..)")
    }
}

pub(crate) fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Placeholder stored in a field whose serializer failed.
pub fn broken_field_placeholder(field: &str) -> String {
    format!(
        "(Error in Bunyan log \"{}\" serializer broke field. See stderr for details.)",
        field
    )
}

/// Serialize one value with the serializer registered for `field`, replacing
/// it with a placeholder on failure.
pub(crate) fn serialize_field(
    field: &str,
    serializer: &Serializer,
    value: &FieldValue,
    diagnostics: &Diagnostics,
) -> FieldValue {
    match serializer.call(value) {
        Ok(serialized) => serialized,
        Err(reason) => {
            diagnostics.warn(
                &format!(
                    "bunyan: ERROR: Exception thrown from the \"{}\" Bunyan serializer. \
                     This should never happen. This is a bug in that serializer function.\n{}",
                    field, reason
                ),
                Some(&format!("serializer:{}", field)),
            );
            FieldValue::String(broken_field_placeholder(field))
        }
    }
}

/// Apply every registered serializer whose field is present in `fields` and
/// not excluded. Absent fields are skipped without invoking the serializer.
pub fn apply_serializers(
    serializers: &Serializers,
    fields: &mut Fields,
    exclude: Option<&str>,
    diagnostics: &Diagnostics,
) {
    for (name, serializer) in serializers {
        if exclude == Some(name.as_str()) {
            continue;
        }
        let Some(value) = fields.get(name) else {
            continue;
        };
        let serialized = serialize_field(name, serializer, value, diagnostics);
        fields.insert(name.clone(), serialized);
    }
}

/// Standard serializers.
pub mod std_serializers {
    use super::*;

    /// Serialize an error.
    ///
    /// An error without a stack is returned unchanged. Otherwise the result is
    /// an object with `message`, `name`, `stack` (including each
    /// `Caused by:` entry of the cause chain) and, when set, `code` and
    /// `signal`. Any other value passes through untouched.
    pub fn err(value: &FieldValue) -> FieldValue {
        match value {
            FieldValue::Error(e) if e.stack.is_some() => FieldValue::Object(error_object(e)),
            other => other.clone(),
        }
    }

    fn error_object(e: &ErrorValue) -> FieldObject {
        let obj = FieldObject::new()
            .with_field("message", e.message.as_str())
            .with_field("name", e.name.as_str())
            .with_field("stack", e.full_stack());
        if let Some(code) = &e.code {
            obj.insert("code", code.as_str());
        }
        if let Some(signal) = &e.signal {
            obj.insert("signal", signal.as_str());
        }
        obj
    }

    /// [`err`] as a registrable serializer.
    pub fn err_serializer() -> Serializer {
        Serializer::from_fn(err)
    }

    /// All standard serializers keyed by field name.
    pub fn all() -> Serializers {
        let mut serializers = Serializers::new();
        serializers.insert("err".to_string(), err_serializer());
        serializers
    }
}
