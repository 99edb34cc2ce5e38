//! Output stream trait and stream configuration

use super::log_level::{Level, LevelSpec};
use super::log_record::LogRecord;
use std::fmt;
use std::sync::Arc;

/// A consumer of log records.
///
/// `write` is called synchronously from the logging call and must return
/// quickly; slow work (network I/O) belongs behind the stream's own deferral.
/// A stream must not panic on any record a logger produces. Logging from
/// inside `write` re-enters the logger and is not supported.
///
/// Streams receive the record itself. A stream that prefers the serialized
/// JSON line overrides [`LogStream::wants_serialized`] and
/// [`LogStream::write_serialized`]; the logger then stringifies each record
/// once per call and hands the same line to every such stream.
pub trait LogStream: Send + Sync {
    fn write(&self, record: &LogRecord);

    fn wants_serialized(&self) -> bool {
        false
    }

    /// `line` is the record's JSON text terminated by a newline.
    fn write_serialized(&self, record: &LogRecord, line: &str) {
        let _ = line;
        self.write(record);
    }

    fn name(&self) -> &str {
        "stream"
    }
}

/// Stream configuration as supplied to a logger.
#[derive(Clone)]
pub struct StreamSpec {
    pub level: Option<LevelSpec>,
    pub stream: Arc<dyn LogStream>,
    pub name: Option<String>,
}

impl StreamSpec {
    pub fn new<S: LogStream + 'static>(stream: S) -> Self {
        Self::from_arc(Arc::new(stream))
    }

    pub fn from_arc(stream: Arc<dyn LogStream>) -> Self {
        Self {
            level: None,
            stream,
            name: None,
        }
    }

    #[must_use]
    pub fn level(mut self, level: impl Into<LevelSpec>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Name used by `Logger::levels_at` lookups
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Debug for StreamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSpec")
            .field("level", &self.level)
            .field("stream", &self.stream.name())
            .field("name", &self.name)
            .finish()
    }
}

/// A stream attached to a logger, with its resolved level.
#[derive(Clone)]
pub struct StreamEntry {
    pub(crate) level: Option<Level>,
    pub(crate) stream: Arc<dyn LogStream>,
    pub(crate) name: Option<String>,
}

impl StreamEntry {
    /// `None` when the configured level name did not resolve.
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn stream(&self) -> &Arc<dyn LogStream> {
        &self.stream
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for StreamEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamEntry")
            .field("level", &self.level)
            .field("stream", &self.stream.name())
            .field("name", &self.name)
            .finish()
    }
}

/// Identifies one attached stream by position or by name.
///
/// Indexes are signed so an out-of-range lookup reports the index the caller
/// passed; negative indexes never match a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKey {
    Index(i64),
    Name(String),
}

impl From<usize> for StreamKey {
    fn from(index: usize) -> Self {
        StreamKey::Index(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl From<i32> for StreamKey {
    fn from(index: i32) -> Self {
        StreamKey::Index(i64::from(index))
    }
}

impl From<i64> for StreamKey {
    fn from(index: i64) -> Self {
        StreamKey::Index(index)
    }
}

impl From<&str> for StreamKey {
    fn from(name: &str) -> Self {
        StreamKey::Name(name.to_string())
    }
}

impl From<String> for StreamKey {
    fn from(name: String) -> Self {
        StreamKey::Name(name)
    }
}
