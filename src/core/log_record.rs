//! Log record

use super::field_value::{FieldValue, Fields};
use super::log_level::Level;
use super::safe_cycles::SafeCycles;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Record schema version
pub const LOG_VERSION: i64 = 1;

/// One structured logging event.
///
/// A record is plain data: an ordered map of fields that always contains
/// `level`, `levelName`, `msg`, `time` and `v` when produced by a
/// [`Logger`](crate::Logger). Records are never modified after construction;
/// [`LogRecord::with_field`] consumes the record and returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    level: Level,
    fields: Fields,
}

impl LogRecord {
    /// A minimal record with the core keys.
    pub fn new(level: Level, msg: impl Into<String>) -> Self {
        let mut fields = Fields::new();
        fields.insert("level".to_string(), level.value().into());
        fields.insert("levelName".to_string(), level.name().into());
        fields.insert("msg".to_string(), FieldValue::String(msg.into()));
        fields.insert("time".to_string(), Utc::now().into());
        fields.insert("v".to_string(), LOG_VERSION.into());
        Self { level, fields }
    }

    /// Dispatch level comes from the numeric `level` field, which call
    /// fields may have overridden; `fallback` when it is not a number.
    pub(crate) fn from_parts(fallback: Level, fields: Fields) -> Self {
        let level = fields
            .get("level")
            .and_then(FieldValue::as_i64)
            .map_or(fallback, Level::new);
        Self { level, fields }
    }

    #[must_use]
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let key = key.into();
        let value = value.into();
        if key == "level" {
            if let Some(level) = value.as_i64() {
                self.level = Level::new(level);
            }
        }
        self.fields.insert(key, value);
        self
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn level_name(&self) -> Option<&str> {
        self.fields.get("levelName").and_then(FieldValue::as_str)
    }

    /// Formatted message, empty when absent.
    pub fn msg(&self) -> &str {
        self.fields.get("msg").and_then(FieldValue::as_str).unwrap_or("")
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.fields.get("time").and_then(FieldValue::as_time)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Cycle-safe JSON value of the whole record.
    pub fn to_json_value(&self) -> serde_json::Value {
        SafeCycles::new().fields_to_json(&self.fields)
    }
}

impl Serialize for LogRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field_value::FieldObject;

    #[test]
    fn test_new_record_core_keys() {
        let record = LogRecord::new(Level::WARN, "disk almost full");
        let keys: Vec<&str> = record.keys().collect();

        assert_eq!(keys, vec!["level", "levelName", "msg", "time", "v"]);
        assert_eq!(record.level(), Level::WARN);
        assert_eq!(record.level_name(), Some("warn"));
        assert_eq!(record.msg(), "disk almost full");
        assert!(record.time().is_some());
    }

    #[test]
    fn test_with_field_returns_new_record() {
        let record = LogRecord::new(Level::INFO, "hello").with_field("count", 2);
        assert_eq!(record.get("count"), Some(&FieldValue::Int(2)));

        let relevelled = record.with_field("level", 50);
        assert_eq!(relevelled.level(), Level::ERROR);
    }

    #[test]
    fn test_from_parts_dispatches_on_level_field() {
        let mut fields = Fields::new();
        fields.insert("level".to_string(), 99.into());
        assert_eq!(LogRecord::from_parts(Level::INFO, fields).level(), Level::new(99));

        let mut fields = Fields::new();
        fields.insert("level".to_string(), "loud".into());
        assert_eq!(LogRecord::from_parts(Level::INFO, fields).level(), Level::INFO);
    }

    #[test]
    fn test_serialize_is_cycle_safe() {
        let obj = FieldObject::new().with_field("id", 1);
        obj.insert("self", obj.clone());
        let record = LogRecord::new(Level::INFO, "cyclic").with_field("obj", obj);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["obj"]["self"], "[Circular]");
        assert_eq!(json["v"], 1);
    }
}
