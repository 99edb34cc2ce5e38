//! # Browser Bunyan
//!
//! Structured, leveled JSON logging in the style of node-bunyan.
//!
//! ## Features
//!
//! - **Structured records**: every call produces one record with `name`,
//!   `level`, `levelName`, `msg`, `time` and `v` plus your own fields
//! - **Multiple streams**: each with its own level, dispatched synchronously
//! - **Child loggers**: copied configuration, or a cheap field-only `fast_child`
//! - **Serializers**: per-field transformation, fault-isolated
//! - **Console and server streams**: raw JSON, plain text, colored text, and a
//!   throttled, deduplicating network batcher
//!
//! ## Example
//!
//! ```
//! use browser_bunyan::{fields, Logger, LoggerOptions, MemoryStream};
//!
//! let memory = MemoryStream::new();
//! let log = Logger::new(LoggerOptions::new().name("app").stream(memory.clone())).unwrap();
//!
//! let req_log = log.fast_child([("req_id", "r-1")]);
//! req_log.info((fields! { "path" => "/" }, "handled in %dms", 12));
//!
//! let record = memory.last().unwrap();
//! assert_eq!(record.msg(), "handled in 12ms");
//! assert_eq!(record.get("req_id").and_then(|v| v.as_str()), Some("r-1"));
//! ```
//!
//! Internal faults (a broken serializer, a panicking stream) never reach the
//! caller; they are reported once per distinct failure on the logger's
//! [`Diagnostics`] channel:
//!
//! ```
//! use browser_bunyan::Diagnostics;
//! use std::sync::Arc;
//!
//! let diagnostics = Diagnostics::with_handler(Arc::new(|msg: &str| eprintln!("{}", msg)));
//! assert!(diagnostics.warn("first", Some("k")));
//! assert!(!diagnostics.warn("again", Some("k")));
//! ```

pub mod appenders;
pub mod core;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::appenders::ConsoleFormattedStream;
    pub use crate::appenders::{
        ConsolePlainStream, ConsoleRawStream, JsonLinesStream, MemoryStream, ServerStream,
        ServerStreamConfig,
    };
    pub use crate::core::{
        create_logger, std_serializers, Diagnostics, ErrorValue, FieldObject, FieldValue, LazyValue,
        Level, LevelSpec, LogArgs, LogRecord, LogStream, Logger, LoggerError, LoggerOptions, Result,
        Serializer, StreamSpec,
    };
}

#[cfg(feature = "console")]
pub use crate::appenders::ConsoleFormattedStream;
pub use crate::appenders::{
    ConsolePlainStream, ConsoleRawStream, JsonLinesStream, MemoryStream, ServerStream,
    ServerStreamConfig,
};
pub use crate::core::{
    create_logger, format, name_from_level, resolve_level, safe_cycles, std_serializers,
    CallShape, Diagnostics, ErrorValue, FieldObject, FieldValue, Fields, LazyValue, Level,
    LevelSpec, LogArgs, LogRecord, LogStream, Logger, LoggerError, LoggerOptions, Result,
    SafeCycles, Serializer, Serializers, StreamKey, StreamSpec, CIRCULAR, LOG_VERSION,
};
