//! Console output streams
//!
//! - [`ConsoleRawStream`]: the record as JSON, routed by level
//! - [`ConsolePlainStream`]: `[HH:MM:SS:mmmm] LEVEL: name: msg (src)`
//! - [`ConsoleFormattedStream`]: the plain layout, coloured per level

use crate::core::{format::inspect, FieldValue, Level, LogRecord, LogStream};
use chrono::{Local, Timelike};

#[cfg(feature = "console")]
use colored::Colorize;

/// Stack of the record's `err` field, serialized or not.
fn err_stack(record: &LogRecord) -> Option<String> {
    match record.get("err")? {
        FieldValue::Object(obj) => obj.get("stack").and_then(|s| s.as_str().map(String::from)),
        FieldValue::Error(err) if err.stack.is_some() => Some(err.full_stack()),
        _ => None,
    }
}

/// The record's `obj` field when it is set to something other than an empty
/// or false-like value.
fn obj_field(record: &LogRecord) -> Option<&FieldValue> {
    match record.get("obj")? {
        FieldValue::Null | FieldValue::Bool(false) | FieldValue::Int(0) => None,
        FieldValue::String(s) if s.is_empty() => None,
        other => Some(other),
    }
}

/// `name` or `name/childName`
fn logger_name(record: &LogRecord) -> String {
    let name = record
        .get("name")
        .map(crate::core::format::to_js_string)
        .unwrap_or_default();
    match record.get("childName") {
        Some(child) => format!("{}/{}", name, crate::core::format::to_js_string(child)),
        None => name,
    }
}

fn padded_level(record: &LogRecord) -> String {
    let name = record
        .level_name()
        .map(String::from)
        .or_else(|| record.level().name().map(String::from))
        .unwrap_or_else(|| "info".to_string());
    format!("{:>5}", name.to_ascii_uppercase())
}

/// `[HH:MM:SS:mmmm]` in local time.
fn clock(record: &LogRecord) -> String {
    match record.time() {
        Some(time) => {
            let local = time.with_timezone(&Local);
            format!(
                "[{:02}:{:02}:{:02}:{:04}]",
                local.hour(),
                local.minute(),
                local.second(),
                local.timestamp_subsec_millis()
            )
        }
        None => "[--:--:--:----]".to_string(),
    }
}

/// Default root stream: prints the record as JSON.
///
/// Records below WARN go to stdout, WARN and above to stderr. An `err` stack
/// is repeated on its own line (stderr), as is an `obj` field (stdout).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRawStream;

impl ConsoleRawStream {
    pub fn new() -> Self {
        Self
    }
}

impl LogStream for ConsoleRawStream {
    fn write(&self, record: &LogRecord) {
        let json = record.to_json_value();
        if record.level() < Level::WARN {
            println!("{}", json);
        } else {
            eprintln!("{}", json);
        }

        if let Some(stack) = err_stack(record) {
            eprintln!("{}", stack);
        }
        if let Some(obj) = obj_field(record) {
            println!("{}", inspect(obj));
        }
    }

    fn name(&self) -> &str {
        "console-raw"
    }
}

/// Human-readable single line per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePlainStream {
    log_by_level: bool,
}

impl ConsolePlainStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send WARN and above to stderr instead of stdout.
    #[must_use]
    pub fn with_log_by_level(mut self, log_by_level: bool) -> Self {
        self.log_by_level = log_by_level;
        self
    }

    pub fn render(&self, record: &LogRecord) -> String {
        let mut line = format!(
            "{} {}: {}: {}",
            clock(record),
            padded_level(record),
            logger_name(record),
            record.msg()
        );
        if let Some(src) = record.get("src") {
            line.push_str(&format!(" ({})", crate::core::format::to_js_string(src)));
        }
        line
    }
}

impl LogStream for ConsolePlainStream {
    fn write(&self, record: &LogRecord) {
        let mut out = self.render(record);
        if let Some(stack) = err_stack(record) {
            out.push('\n');
            out.push_str(&stack);
        }
        if let Some(obj) = obj_field(record) {
            out.push('\n');
            out.push_str(&inspect(obj));
        }
        if self.log_by_level && record.level() >= Level::WARN {
            eprintln!("{}", out);
        } else {
            println!("{}", out);
        }
    }

    fn name(&self) -> &str {
        "console-plain"
    }
}

/// The plain layout with terminal colours: the level coloured by severity,
/// the message highlighted and `src` dimmed.
#[cfg(feature = "console")]
#[derive(Debug, Clone, Copy)]
pub struct ConsoleFormattedStream {
    use_colors: bool,
    log_by_level: bool,
}

#[cfg(feature = "console")]
impl ConsoleFormattedStream {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            log_by_level: false,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Send WARN and above to stderr instead of stdout.
    #[must_use]
    pub fn with_log_by_level(mut self, log_by_level: bool) -> Self {
        self.log_by_level = log_by_level;
        self
    }

    pub fn render(&self, record: &LogRecord) -> String {
        let level = padded_level(record);
        let name = logger_name(record);
        let src = record.get("src").map(crate::core::format::to_js_string);

        let mut line = if self.use_colors {
            format!(
                "{} {}: {}: {}",
                clock(record).dimmed(),
                level.color(record.level().color_code()),
                name.dimmed(),
                record.msg().blue()
            )
        } else {
            format!("{} {}: {}: {}", clock(record), level, name, record.msg())
        };
        if let Some(src) = src {
            if self.use_colors {
                line.push_str(&format!(" {}", src.dimmed().italic()));
            } else {
                line.push_str(&format!(" {}", src));
            }
        }
        if let Some(obj) = obj_field(record) {
            line.push('\n');
            line.push_str(&inspect(obj));
        }
        if let Some(stack) = err_stack(record) {
            line.push('\n');
            line.push_str(&stack);
        }
        line
    }
}

#[cfg(feature = "console")]
impl Default for ConsoleFormattedStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "console")]
impl LogStream for ConsoleFormattedStream {
    fn write(&self, record: &LogRecord) {
        let out = self.render(record);
        if self.log_by_level && record.level() >= Level::WARN {
            eprintln!("{}", out);
        } else {
            println!("{}", out);
        }
    }

    fn name(&self) -> &str {
        "console-formatted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorValue, FieldObject};

    fn record() -> LogRecord {
        LogRecord::new(Level::WARN, "cache miss")
            .with_field("name", "app")
            .with_field("childName", "cache")
    }

    #[test]
    fn test_plain_render_layout() {
        let line = ConsolePlainStream::new().render(&record().with_field("src", "main.rs:10:5"));

        assert!(line.starts_with('['));
        assert!(line.contains("]  WARN: app/cache: cache miss (main.rs:10:5)"), "{}", line);
    }

    #[test]
    fn test_level_name_padding() {
        let line = ConsolePlainStream::new().render(&LogRecord::new(Level::DEBUG, "x").with_field("name", "a"));
        assert!(line.contains("] DEBUG: a: x"), "{}", line);
    }

    #[test]
    fn test_err_stack_from_serialized_and_raw_error() {
        let raw = LogRecord::new(Level::ERROR, "boom")
            .with_field("err", ErrorValue::new("Error", "boom").with_stack("Error: boom\n    at f"));
        assert_eq!(err_stack(&raw).as_deref(), Some("Error: boom\n    at f"));

        let serialized = LogRecord::new(Level::ERROR, "boom")
            .with_field("err", FieldObject::new().with_field("stack", "Error: boom"));
        assert_eq!(err_stack(&serialized).as_deref(), Some("Error: boom"));

        let stackless = LogRecord::new(Level::ERROR, "boom").with_field("err", ErrorValue::new("Error", "boom"));
        assert_eq!(err_stack(&stackless), None);
    }

    #[test]
    fn test_obj_field_falsy_values_are_skipped() {
        assert!(obj_field(&record().with_field("obj", FieldValue::Null)).is_none());
        assert!(obj_field(&record().with_field("obj", "")).is_none());
        assert!(obj_field(&record().with_field("obj", 3)).is_some());
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_formatted_without_colors_matches_plain_layout() {
        let formatted = ConsoleFormattedStream::new().with_colors(false).render(&record());
        let plain = ConsolePlainStream::new().render(&record());
        assert_eq!(formatted, plain);
    }
}
