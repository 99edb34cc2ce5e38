//! JSON lines stream
//!
//! Writes each record as a single-line JSON object (JSONL format). This is a
//! serialized stream: the logger stringifies the record once and hands the
//! line to every stream that asks for it.

use crate::core::{LogRecord, LogStream, Result};
use parking_lot::{Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonLinesStream<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesStream<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Access the underlying writer.
    pub fn writer(&self) -> MutexGuard<'_, W> {
        self.writer.lock()
    }

    pub fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn write_line(&self, line: &str) {
        if let Err(e) = self.writer.lock().write_all(line.as_bytes()) {
            eprintln!("[LOGGER ERROR] json-lines stream write failed: {}", e);
        }
    }
}

impl JsonLinesStream<BufWriter<File>> {
    /// Append to the file at `path`, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> LogStream for JsonLinesStream<W> {
    fn write(&self, record: &LogRecord) {
        let mut line = record.to_json_value().to_string();
        line.push('\n');
        self.write_line(&line);
    }

    fn wants_serialized(&self) -> bool {
        true
    }

    fn write_serialized(&self, _record: &LogRecord, line: &str) {
        self.write_line(line);
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldObject, Level, Logger, LoggerOptions, StreamSpec};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_json_lines_file() -> Result<()> {
        let dir = tempdir()?;
        let log_path = dir.path().join("app.jsonl");

        let stream = Arc::new(JsonLinesStream::open(&log_path)?);
        let log = Logger::new(
            LoggerOptions::new()
                .name("app")
                .streams(vec![StreamSpec::from_arc(stream.clone())]),
        )?;

        log.info((FieldObject::new().with_field("user_id", 123), "User logged in"));
        log.warn("second");
        stream.flush()?;

        let content = fs::read_to_string(&log_path)?;
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["msg"], "User logged in");
        assert_eq!(lines[0]["user_id"], 123);
        assert_eq!(lines[1]["levelName"], "warn");

        Ok(())
    }

    #[test]
    fn test_direct_write_renders_record() {
        let stream = JsonLinesStream::new(Vec::new());
        stream.write(&LogRecord::new(Level::ERROR, "direct"));

        let text = String::from_utf8(stream.writer().clone()).unwrap();
        assert!(text.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(json["level"], 50);
        assert_eq!(json["msg"], "direct");
    }

    #[test]
    fn test_cyclic_field_is_written() {
        let stream = Arc::new(JsonLinesStream::new(Vec::new()));
        let log = Logger::new(
            LoggerOptions::new()
                .name("app")
                .streams(vec![StreamSpec::from_arc(stream.clone())]),
        )
        .unwrap();

        let node = FieldObject::new().with_field("id", 1);
        node.insert("parent", node.clone());
        log.info((FieldObject::new().with_field("node", node), "cycle"));

        let text = String::from_utf8(stream.writer().clone()).unwrap();
        assert!(text.contains(r#""parent":"[Circular]""#), "{}", text);
    }
}
