//! Core logger types and traits

pub mod diagnostics;
pub mod error;
pub mod field_value;
pub mod format;
pub mod log_args;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod safe_cycles;
pub mod serializers;
pub mod stream;

pub use diagnostics::{Diagnostics, WarningHandler};
pub use error::{LoggerError, Result};
pub use field_value::{ErrorValue, FieldObject, FieldValue, Fields, LazyValue};
pub use format::{format, inspect};
pub use log_args::{CallShape, LogArgs};
pub use log_level::{name_from_level, resolve_level, Level, LevelSpec};
pub use log_record::{LogRecord, LOG_VERSION};
pub use logger::{create_logger, Logger, LoggerOptions};
pub use safe_cycles::{safe_cycles, to_json_strict, CycleError, SafeCycles, CIRCULAR};
pub use serializers::{apply_serializers, std_serializers, Serializer, SerializerError, Serializers};
pub use stream::{LogStream, StreamEntry, StreamKey, StreamSpec};
