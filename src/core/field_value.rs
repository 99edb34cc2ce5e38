//! Dynamic values carried by log records
//!
//! This module provides:
//! - `FieldValue`: any value a record field or format argument can hold
//! - `FieldObject`: a shared, interior-mutable map (objects are shared by reference)
//! - `ErrorValue`: an error-like value with name, message, stack and cause chain
//! - `LazyValue`: a value computed only when a record is actually built

use super::safe_cycles::SafeCycles;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered field map.
pub type Fields = IndexMap<String, FieldValue>;

/// Value type for structured logging fields
#[derive(Clone)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<FieldValue>),
    Object(FieldObject),
    Error(ErrorValue),
    Time(DateTime<Utc>),
    Lazy(LazyValue),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&FieldObject> {
        match self {
            FieldValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            FieldValue::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Evaluate a top-level lazy value; other values are returned unchanged.
    pub fn resolve(self) -> FieldValue {
        let mut value = self;
        while let FieldValue::Lazy(lazy) = value {
            value = lazy.evaluate();
        }
        value
    }

    /// Look up a key on an object value.
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        match self {
            FieldValue::Object(obj) => obj.get(key),
            _ => None,
        }
    }

    /// Cycle-safe conversion to `serde_json::Value`
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        SafeCycles::new().to_json(self)
    }
}

impl PartialEq for FieldValue {
    /// Scalars compare by value, objects and lazy values by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Float(b)) | (FieldValue::Float(b), FieldValue::Int(a)) => {
                (*a as f64) == *b
            }
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => a.ptr_eq(b),
            (FieldValue::Error(a), FieldValue::Error(b)) => a == b,
            (FieldValue::Time(a), FieldValue::Time(b)) => a == b,
            (FieldValue::Lazy(a), FieldValue::Lazy(b)) => Arc::ptr_eq(&a.compute, &b.compute),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Lazy(lazy) => write!(f, "{:?}", lazy),
            other => write!(f, "{}", SafeCycles::new().stringify(other)),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::String(s.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        i64::try_from(i).map_or(FieldValue::Float(i as f64), FieldValue::Int)
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Time(t)
    }
}

impl From<FieldObject> for FieldValue {
    fn from(obj: FieldObject) -> Self {
        FieldValue::Object(obj)
    }
}

impl From<Fields> for FieldValue {
    fn from(fields: Fields) -> Self {
        FieldValue::Object(FieldObject::from_fields(fields))
    }
}

impl From<ErrorValue> for FieldValue {
    fn from(err: ErrorValue) -> Self {
        FieldValue::Error(err)
    }
}

impl From<LazyValue> for FieldValue {
    fn from(lazy: LazyValue) -> Self {
        FieldValue::Lazy(lazy)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Object(FieldObject::from_fields(
                map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect(),
            )),
        }
    }
}

/// A shared map. Cloning a `FieldObject` clones the handle, not the contents,
/// so one object may be referenced from several places (or from itself).
#[derive(Clone, Default)]
pub struct FieldObject(Arc<RwLock<Fields>>);

impl FieldObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self(Arc::new(RwLock::new(fields)))
    }

    /// Add a field (builder form)
    #[must_use]
    pub fn with_field<K, V>(self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.insert(key, value);
        self
    }

    pub fn insert<K, V>(&self, key: K, value: V) -> Option<FieldValue>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.0.write().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<FieldValue> {
        self.0.write().shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.0.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Shallow copy of the current entries.
    pub fn snapshot(&self) -> Fields {
        self.0.read().clone()
    }

    pub fn ptr_eq(&self, other: &FieldObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn identity(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl IntoIterator for FieldObject {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    /// Iterates over a snapshot of the entries.
    fn into_iter(self) -> Self::IntoIter {
        self.snapshot().into_iter()
    }
}

impl PartialEq for FieldObject {
    /// Identity, not contents.
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for FieldObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = FieldValue::Object(self.clone());
        write!(f, "{}", SafeCycles::new().stringify(&value))
    }
}

/// An error-like value.
///
/// `stack` is optional: an error without a stack passes through the standard
/// `err` serializer unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub code: Option<String>,
    pub signal: Option<String>,
    pub cause: Option<Box<ErrorValue>>,
    /// Additional properties a custom serializer may pick up.
    pub properties: Fields,
}

impl ErrorValue {
    /// An error without a stack.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// An error whose stack is the current backtrace.
    pub fn capture(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(name, message);
        let backtrace = std::backtrace::Backtrace::force_capture();
        err.stack = Some(format!("{}\n{}", err, backtrace));
        err
    }

    /// Convert a std error, following its `source()` chain into `cause`.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut value = Self::new("Error", err.to_string());
        value.stack = Some(value.to_string());
        if let Some(source) = err.source() {
            value.cause = Some(Box::new(Self::from_error(source)));
        }
        value
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let header = self.to_string();
        self.name = name.into();
        // a stack that is only the header line follows the rename
        if self.stack.as_deref() == Some(header.as_str()) {
            self.stack = Some(self.to_string());
        }
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: ErrorValue) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    #[must_use]
    pub fn with_property<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Stack of this error followed by each cause, joined with `Caused by:`.
    pub fn full_stack(&self) -> String {
        let mut ret = self.stack.clone().unwrap_or_else(|| self.to_string());
        if let Some(cause) = &self.cause {
            ret.push_str("\nCaused by: ");
            ret.push_str(&cause.full_stack());
        }
        ret
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

/// A deferred value, evaluated when a record is built or rendered.
#[derive(Clone)]
pub struct LazyValue {
    compute: Arc<dyn Fn() -> FieldValue + Send + Sync>,
}

impl LazyValue {
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> FieldValue + Send + Sync + 'static,
    {
        Self {
            compute: Arc::new(compute),
        }
    }

    pub fn evaluate(&self) -> FieldValue {
        (self.compute)()
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazyValue(..)")
    }
}
