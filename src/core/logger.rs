//! Main logger implementation
//!
//! A [`Logger`] owns its configuration (streams, level, serializers, static
//! fields), builds one [`LogRecord`] per enabled logging call and hands it to
//! every attached stream whose level admits it, synchronously and in
//! attachment order.
//!
//! Logging calls never fail and never panic through to the caller: serializer
//! faults, stringify faults and panicking streams are reported on the
//! logger's [`Diagnostics`] channel instead. Logging from inside a serializer
//! or a stream's `write` re-enters the logger and is not supported.

use super::{
    diagnostics::Diagnostics,
    error::{LoggerError, Result},
    field_value::{FieldValue, Fields},
    format::format,
    log_args::{CallShape, LogArgs},
    log_level::{admits, Level, LevelSpec},
    log_record::{LogRecord, LOG_VERSION},
    serializers::{
        apply_serializers, panic_message, serialize_field, std_serializers, Serializer, Serializers,
    },
    stream::{LogStream, StreamEntry, StreamKey, StreamSpec},
};
use crate::appenders::ConsoleRawStream;
use chrono::Utc;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe, Location};
use std::sync::Arc;

/// Options for [`Logger::new`] and [`Logger::child`].
///
/// `stream` and `streams` are mutually exclusive. A root logger requires a
/// name; a child must not set one. Everything added with [`field`] becomes a
/// static field of every record.
///
/// [`field`]: LoggerOptions::field
#[derive(Clone, Default)]
pub struct LoggerOptions {
    name: Option<String>,
    stream: Option<Arc<dyn LogStream>>,
    streams: Option<Vec<StreamSpec>>,
    level: Option<LevelSpec>,
    serializers: Option<Serializers>,
    src: bool,
    fields: Fields,
    diagnostics: Option<Arc<Diagnostics>>,
}

impl LoggerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger name, recorded as the `name` field
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Single output stream; its level comes from [`LoggerOptions::level`].
    #[must_use]
    pub fn stream<S: LogStream + 'static>(self, stream: S) -> Self {
        self.stream_arc(Arc::new(stream))
    }

    #[must_use]
    pub fn stream_arc(mut self, stream: Arc<dyn LogStream>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Output streams; [`LoggerOptions::level`] is the default for specs
    /// without their own level.
    #[must_use]
    pub fn streams(mut self, streams: impl IntoIterator<Item = StreamSpec>) -> Self {
        self.streams
            .get_or_insert_with(Vec::new)
            .extend(streams);
        self
    }

    #[must_use]
    pub fn level(mut self, level: impl Into<LevelSpec>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn serializer(mut self, field: impl Into<String>, serializer: Serializer) -> Self {
        self.serializers
            .get_or_insert_with(Serializers::new)
            .insert(field.into(), serializer);
        self
    }

    #[must_use]
    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers
            .get_or_insert_with(Serializers::new)
            .extend(serializers);
        self
    }

    /// Record the call site of every logging call in a `src` field.
    #[must_use]
    pub fn src(mut self, enabled: bool) -> Self {
        self.src = enabled;
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Warning channel; children inherit their parent's unless overridden.
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    fn validate(&self, is_child: bool) -> Result<()> {
        let field_name = self.fields.get("name");
        if is_child {
            if self.name.is_some() || field_name.is_some() {
                return Err(LoggerError::config(
                    "name",
                    "invalid options.name: child cannot set logger name",
                ));
            }
        } else {
            let has_name = match &self.name {
                Some(name) => !name.is_empty(),
                None => field_name.and_then(FieldValue::as_str).is_some_and(|n| !n.is_empty()),
            };
            if !has_name {
                return Err(LoggerError::config("name", "options.name (string) is required"));
            }
        }
        if self.stream.is_some() && self.streams.is_some() {
            return Err(LoggerError::config(
                "streams",
                "cannot mix \"streams\" and \"stream\" options",
            ));
        }
        if let Some(serializers) = &self.serializers {
            validate_serializer_names(serializers.keys())?;
        }
        Ok(())
    }
}

impl fmt::Debug for LoggerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerOptions")
            .field("name", &self.name)
            .field("stream", &self.stream.as_ref().map(|s| s.name()))
            .field("streams", &self.streams)
            .field("level", &self.level)
            .field("serializers", &self.serializers.as_ref().map(|s| s.keys().collect::<Vec<_>>()))
            .field("src", &self.src)
            .field("fields", &self.fields)
            .finish()
    }
}

fn validate_serializer_names<'a>(names: impl IntoIterator<Item = &'a String>) -> Result<()> {
    for name in names {
        if name.is_empty() {
            return Err(LoggerError::serializer(name.as_str(), "field name must not be empty"));
        }
    }
    Ok(())
}

/// Structured, leveled logger.
///
/// # Child loggers
///
/// [`Logger::child`] copies the parent's streams, serializers and fields and
/// then applies its own options on top: new streams are added to the
/// inherited ones, `level` re-levels the inherited streams.
///
/// [`Logger::fast_child`] only adds static fields. It shares the parent's
/// stream list and serializer map by reference and skips serialization of the
/// new fields, so it is cheap enough to create per request. Any later
/// reconfiguration through the child (`add_stream`, `add_serializers`,
/// `set_level`, `set_levels_at`) copies the shared structure first; the
/// parent is never affected.
///
/// # Example
///
/// ```
/// use browser_bunyan::{Logger, LoggerOptions, MemoryStream, fields};
///
/// let memory = MemoryStream::new();
/// let log = Logger::new(LoggerOptions::new().name("app").stream(memory.clone())).unwrap();
///
/// log.info(("listening on %d", 8080));
/// log.warn((fields! { "user" => "alice" }, "login failed"));
/// assert!(!log.debug(()));
///
/// assert_eq!(memory.len(), 2);
/// assert_eq!(memory.records()[0].msg(), "listening on 8080");
/// ```
pub struct Logger {
    level: Option<Level>,
    streams: Arc<Vec<StreamEntry>>,
    serializers: Arc<Serializers>,
    src: bool,
    /// Never mutated after construction.
    fields: Arc<Fields>,
    has_serialized_streams: bool,
    diagnostics: Arc<Diagnostics>,
}

/// Equivalent to [`Logger::new`].
pub fn create_logger(options: LoggerOptions) -> Result<Logger> {
    Logger::new(options)
}

impl Logger {
    /// Create a root logger.
    ///
    /// Without `stream` or `streams` a [`ConsoleRawStream`] is attached at
    /// `level` (default INFO).
    pub fn new(options: LoggerOptions) -> Result<Self> {
        options.validate(false)?;
        let diagnostics = options
            .diagnostics
            .clone()
            .unwrap_or_else(|| Arc::new(Diagnostics::new()));
        let mut logger = Self {
            level: Some(Level::UNSET),
            streams: Arc::new(Vec::new()),
            serializers: Arc::new(Serializers::new()),
            src: false,
            fields: Arc::new(Fields::new()),
            has_serialized_streams: false,
            diagnostics,
        };
        logger.configure(options, false);
        Ok(logger)
    }

    /// Create a child logger with copied configuration.
    pub fn child(&self, options: LoggerOptions) -> Result<Logger> {
        options.validate(true)?;
        let diagnostics = options
            .diagnostics
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.diagnostics));
        let mut child = Logger {
            level: self.level,
            streams: Arc::new(self.streams.as_ref().clone()),
            serializers: Arc::new(self.serializers.as_ref().clone()),
            src: self.src,
            fields: Arc::new(self.fields.as_ref().clone()),
            has_serialized_streams: self.has_serialized_streams,
            diagnostics,
        };
        if let Some(level) = options.level.clone() {
            child.set_level(level);
        }
        child.configure(options, true);
        Ok(child)
    }

    /// Create a child that only adds static fields, sharing streams and
    /// serializers with this logger. The fields are stored as given, without
    /// passing through serializers.
    pub fn fast_child<I, K, V>(&self, fields: I) -> Logger
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut merged = self.fields.as_ref().clone();
        merged.extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        Logger {
            level: self.level,
            streams: Arc::clone(&self.streams),
            serializers: Arc::clone(&self.serializers),
            src: self.src,
            fields: Arc::new(merged),
            has_serialized_streams: self.has_serialized_streams,
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }

    /// Apply stream, serializer, src and field options. Options are already
    /// validated.
    fn configure(&mut self, options: LoggerOptions, is_child: bool) {
        let LoggerOptions {
            name,
            stream,
            streams,
            level,
            serializers,
            src,
            fields: extra,
            diagnostics: _,
        } = options;

        if let Some(stream) = stream {
            let mut spec = StreamSpec::from_arc(stream);
            spec.level = level;
            self.add_stream(spec);
        } else if let Some(streams) = streams {
            let default_level = level.unwrap_or_else(|| Level::INFO.into());
            for spec in streams {
                self.add_stream_with_default(spec, default_level.clone());
            }
        } else if !is_child {
            let mut spec = StreamSpec::new(ConsoleRawStream::new());
            spec.level = level;
            self.add_stream(spec);
        }

        if let Some(serializers) = serializers {
            self.install_serializers(serializers);
        }
        if src {
            self.src = true;
        }

        let mut fields = Fields::with_capacity(extra.len() + 1);
        if let Some(name) = name {
            fields.insert("name".to_string(), name.into());
        }
        fields.extend(extra);
        if fields.is_empty() {
            return;
        }
        if !self.serializers.is_empty() {
            apply_serializers(&self.serializers, &mut fields, None, &self.diagnostics);
        }
        let mut merged = self.fields.as_ref().clone();
        merged.extend(fields);
        self.fields = Arc::new(merged);
    }

    /// Attach a stream; a spec without a level gets INFO.
    pub fn add_stream(&mut self, spec: StreamSpec) {
        self.add_stream_with_default(spec, Level::INFO);
    }

    /// Attach a stream, falling back to `default_level` when the spec has no
    /// level. The logger's level is lowered to the stream's level if needed.
    pub fn add_stream_with_default(&mut self, spec: StreamSpec, default_level: impl Into<LevelSpec>) {
        let level = match &spec.level {
            Some(level) => level.resolve(),
            None => default_level.into().resolve(),
        };
        self.lower_level(level);
        self.has_serialized_streams |= spec.stream.wants_serialized();
        Arc::make_mut(&mut self.streams).push(StreamEntry {
            level,
            stream: spec.stream,
            name: spec.name,
        });
    }

    /// Install serializers, overwriting existing entries for the same field.
    /// Nothing is installed if any field name is invalid.
    pub fn add_serializers<I, K>(&mut self, serializers: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Serializer)>,
        K: Into<String>,
    {
        let serializers: Serializers = serializers
            .into_iter()
            .map(|(field, serializer)| (field.into(), serializer))
            .collect();
        validate_serializer_names(serializers.keys())?;
        self.install_serializers(serializers);
        Ok(())
    }

    fn install_serializers(&mut self, serializers: Serializers) {
        if serializers.is_empty() {
            return;
        }
        Arc::make_mut(&mut self.serializers).extend(serializers);
    }

    /// Effective level: the lowest level among the attached streams.
    ///
    /// `Some(Level::UNSET)` before any stream is attached, `None` after the
    /// logger was set to an unknown level name.
    #[inline]
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    /// Set every attached stream, and the logger, to `level`.
    pub fn set_level(&mut self, level: impl Into<LevelSpec>) {
        let level = level.into().resolve();
        for entry in Arc::make_mut(&mut self.streams).iter_mut() {
            entry.level = level;
        }
        self.level = level;
    }

    /// Level of each attached stream, in attachment order.
    pub fn levels(&self) -> Vec<Option<Level>> {
        self.streams.iter().map(|s| s.level).collect()
    }

    /// Level of one stream, by index or name.
    pub fn levels_at(&self, key: impl Into<StreamKey>) -> Result<Option<Level>> {
        let index = self.find_stream(&key.into())?;
        Ok(self.streams[index].level)
    }

    /// Set the level of one stream. The logger's level is lowered if the new
    /// level is below it, never raised. A logger at an unknown level takes
    /// the new level.
    pub fn set_levels_at(
        &mut self,
        key: impl Into<StreamKey>,
        level: impl Into<LevelSpec>,
    ) -> Result<()> {
        let index = self.find_stream(&key.into())?;
        let level = level.into().resolve();
        Arc::make_mut(&mut self.streams)[index].level = level;
        self.lower_level(level);
        Ok(())
    }

    /// Lower the logger's level to a stream's level. A logger left at an
    /// unknown level takes the stream's level outright.
    fn lower_level(&mut self, level: Option<Level>) {
        match (level, self.level) {
            (Some(new), Some(current)) if new < current => self.level = Some(new),
            (Some(new), None) => self.level = Some(new),
            _ => {}
        }
    }

    fn find_stream(&self, key: &StreamKey) -> Result<usize> {
        match key {
            StreamKey::Index(index) => usize::try_from(*index)
                .ok()
                .filter(|i| *i < self.streams.len())
                .ok_or_else(|| LoggerError::stream_index(*index, self.streams.len())),
            StreamKey::Name(name) => self
                .streams
                .iter()
                .position(|s| s.name.as_deref() == Some(name.as_str()))
                .ok_or_else(|| LoggerError::stream_not_found(name.as_str())),
        }
    }

    #[inline]
    pub fn is_level_enabled(&self, level: Level) -> bool {
        admits(self.level, level)
    }

    pub fn streams(&self) -> &[StreamEntry] {
        &self.streams
    }

    pub fn serializers(&self) -> &Serializers {
        &self.serializers
    }

    /// Static fields attached to every record.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(FieldValue::as_str)
    }

    pub fn src(&self) -> bool {
        self.src
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Whether both loggers use the same stream list (fast children do).
    pub fn shares_streams_with(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.streams, &other.streams)
    }

    pub fn shares_serializers_with(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.serializers, &other.serializers)
    }

    /// Log at an arbitrary level.
    ///
    /// Returns whether `level` is enabled. Empty arguments only query. A
    /// disabled call returns before touching its arguments.
    #[track_caller]
    pub fn log(&self, level: Level, args: impl Into<LogArgs>) -> bool {
        if !admits(self.level, level) {
            return false;
        }
        let args = args.into();
        if args.is_empty() {
            return true;
        }

        let location = Location::caller();
        let built = catch_unwind(AssertUnwindSafe(|| {
            args.classify()
                .map(|shape| self.build_record(level, shape, location))
        }));
        match built {
            Ok(Some(record)) => self.emit(&record),
            Ok(None) => {}
            Err(panic_info) => {
                let reason = panic_message(panic_info.as_ref());
                self.diagnostics.warn(
                    &format!(
                        "bunyan: ERROR: a lazily computed value panicked while building a \
                         \"{}\" record; the record was dropped.\n{}",
                        level, reason
                    ),
                    Some(&format!("lazy:{}", reason)),
                );
            }
        }
        true
    }

    fn build_record(&self, level: Level, shape: CallShape, location: &Location<'_>) -> LogRecord {
        let (call_fields, msg_args, exclude) = match shape {
            CallShape::Error { err, msg_args } => {
                let serializer = self
                    .serializers
                    .get("err")
                    .cloned()
                    .unwrap_or_else(std_serializers::err_serializer);
                let message = err.message.clone();
                let serialized =
                    serialize_field("err", &serializer, &FieldValue::Error(err), &self.diagnostics);
                let mut fields = Fields::with_capacity(1);
                fields.insert("err".to_string(), serialized);
                let msg_args = if msg_args.is_empty() {
                    vec![FieldValue::String(message)]
                } else {
                    msg_args
                };
                (Some(fields), msg_args, Some("err"))
            }
            CallShape::Message { msg_args } => (None, msg_args, None),
            CallShape::Fields { fields, msg_args } => {
                let fields = fields.map(|obj| obj.snapshot());
                let err_message = match fields.as_ref().and_then(|f| f.get("err")) {
                    Some(value) if msg_args.is_empty() => match value.clone().resolve() {
                        FieldValue::Error(err) => Some(err.message),
                        _ => None,
                    },
                    _ => None,
                };
                let msg_args = match err_message {
                    Some(message) => vec![FieldValue::String(message)],
                    None => msg_args,
                };
                (fields, msg_args, None)
            }
        };

        let mut rec = Fields::with_capacity(self.fields.len() + 8);
        for (key, value) in self.fields.iter() {
            rec.insert(key.clone(), value.clone().resolve());
        }
        rec.insert("level".to_string(), level.value().into());
        rec.insert("levelName".to_string(), level.name().into());
        if let Some(mut fields) = call_fields {
            for value in fields.values_mut() {
                *value = std::mem::replace(value, FieldValue::Null).resolve();
            }
            if !self.serializers.is_empty() {
                apply_serializers(&self.serializers, &mut fields, exclude, &self.diagnostics);
            }
            rec.extend(fields);
        }
        let msg = if msg_args.is_empty() {
            String::new()
        } else {
            format(&msg_args)
        };
        rec.insert("msg".to_string(), msg.into());
        if !rec.contains_key("time") {
            rec.insert("time".to_string(), Utc::now().into());
        }
        if self.src && !rec.contains_key("src") {
            let src = format!("{}:{}:{}", location.file(), location.line(), location.column());
            rec.insert("src".to_string(), src.into());
        }
        rec.insert("v".to_string(), LOG_VERSION.into());
        LogRecord::from_parts(level, rec)
    }

    fn emit(&self, record: &LogRecord) {
        let line = self
            .has_serialized_streams
            .then(|| self.to_json_line(record));

        for entry in self.streams.iter() {
            if !admits(entry.level, record.level()) {
                continue;
            }
            let written = catch_unwind(AssertUnwindSafe(|| match &line {
                Some(line) if entry.stream.wants_serialized() => {
                    entry.stream.write_serialized(record, line)
                }
                _ => entry.stream.write(record),
            }));
            if let Err(panic_info) = written {
                let reason = panic_message(panic_info.as_ref());
                self.diagnostics.warn(
                    &format!(
                        "bunyan: ERROR: stream \"{}\" panicked in write. \
                         Other streams continue to receive records.\n{}",
                        entry.stream.name(),
                        reason
                    ),
                    Some(&format!("stream:{}:{}", entry.stream.name(), reason)),
                );
            }
        }
    }

    /// Stringify a record as one JSON line, without emitting it.
    ///
    /// Cyclic references render as `"[Circular]"`. If rendering panics, a
    /// placeholder line is returned and a warning is emitted once per
    /// distinct failure.
    pub fn to_json_line(&self, record: &LogRecord) -> String {
        match catch_unwind(AssertUnwindSafe(|| record.to_json_value())) {
            Ok(value) => {
                let mut line = value.to_string();
                line.push('\n');
                line
            }
            Err(panic_info) => {
                let reason = panic_message(panic_info.as_ref());
                let dedup_key = reason.lines().take(2).collect::<Vec<_>>().join("\n");
                self.diagnostics.warn(
                    &format!(
                        "bunyan: ERROR: Exception in `stringify(rec)`. Record:\n{}",
                        indent(&format!(
                            "level={} msg={:?}\n{}",
                            record.level().value(),
                            record.msg(),
                            reason
                        ))
                    ),
                    Some(&dedup_key),
                );
                format!(
                    "(Exception in stringify(rec): {}. See stderr for details.)\n",
                    serde_json::Value::String(reason)
                )
            }
        }
    }
}

fn indent(s: &str) -> String {
    s.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

macro_rules! level_methods {
    ($($(#[$doc:meta])* $method:ident => $level:expr;)+) => {
        impl Logger {
            $(
                $(#[$doc])*
                #[track_caller]
                pub fn $method(&self, args: impl Into<LogArgs>) -> bool {
                    self.log($level, args)
                }
            )+
        }
    };
}

level_methods! {
    /// Log at TRACE. `log.trace(())` only reports whether TRACE is enabled.
    trace => Level::TRACE;
    /// Log at DEBUG
    debug => Level::DEBUG;
    /// Log at INFO.
    ///
    /// Accepts `(msg, args..)`, `(err, [msg, args..])` or
    /// `(fields, [msg, args..])`; see [`LogArgs`].
    info => Level::INFO;
    warn => Level::WARN;
    error => Level::ERROR;
    fatal => Level::FATAL;
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("streams", &self.streams)
            .field("serializers", &self.serializers.keys().collect::<Vec<_>>())
            .field("src", &self.src)
            .field("fields", &self.fields)
            .finish()
    }
}
