//! Logging macros for ergonomic per-level calls.
//!
//! The level macros accept any number of arguments convertible into
//! [`FieldValue`](crate::FieldValue), so call sites read like the
//! variadic per-level methods without building a tuple by hand.
//!
//! # Examples
//!
//! ```
//! use browser_bunyan::{fields, info, warn, Logger, LoggerOptions, MemoryStream};
//!
//! let memory = MemoryStream::new();
//! let log = Logger::new(LoggerOptions::new().name("svc").stream(memory.clone())).unwrap();
//!
//! info!(log, "Server started");
//! info!(log, "listening on %s:%d", "0.0.0.0", 8080);
//! warn!(log, fields! { "attempt" => 3 }, "retrying");
//!
//! let records = memory.records();
//! assert_eq!(records[1].msg(), "listening on 0.0.0.0:8080");
//! assert_eq!(records[2].get("attempt").and_then(|v| v.as_i64()), Some(3));
//! ```

/// Log at an explicit level.
///
/// ```
/// # use browser_bunyan::{Level, Logger, LoggerOptions, MemoryStream};
/// # let log = Logger::new(LoggerOptions::new().name("x").stream(MemoryStream::new())).unwrap();
/// use browser_bunyan::log;
/// assert!(log!(log, Level::ERROR, "code %d", 500));
/// assert!(!log!(log, Level::DEBUG));
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr) => {
        $logger.log($level, ())
    };
    ($logger:expr, $level:expr, $($arg:expr),+ $(,)?) => {
        $logger.log(
            $level,
            $crate::LogArgs::from(vec![$($crate::FieldValue::from($arg)),+]),
        )
    };
}

/// Log at TRACE.
#[macro_export]
macro_rules! trace {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::log!($logger, $crate::Level::TRACE $(, $arg)*)
    };
}

/// Log at DEBUG.
#[macro_export]
macro_rules! debug {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::log!($logger, $crate::Level::DEBUG $(, $arg)*)
    };
}

/// Log at INFO.
#[macro_export]
macro_rules! info {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::log!($logger, $crate::Level::INFO $(, $arg)*)
    };
}

/// Log at WARN.
#[macro_export]
macro_rules! warn {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::log!($logger, $crate::Level::WARN $(, $arg)*)
    };
}

/// Log at ERROR.
///
/// ```
/// # use browser_bunyan::{Logger, LoggerOptions, MemoryStream, ErrorValue};
/// # let memory = MemoryStream::new();
/// # let log = Logger::new(LoggerOptions::new().name("x").stream(memory.clone())).unwrap();
/// use browser_bunyan::error;
/// error!(log, ErrorValue::capture("TypeError", "boom"));
/// assert_eq!(memory.last().unwrap().msg(), "boom");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::log!($logger, $crate::Level::ERROR $(, $arg)*)
    };
}

/// Log at FATAL.
#[macro_export]
macro_rules! fatal {
    ($logger:expr $(, $arg:expr)* $(,)?) => {
        $crate::log!($logger, $crate::Level::FATAL $(, $arg)*)
    };
}

/// Build a [`FieldObject`](crate::FieldObject) from `key => value` pairs.
///
/// ```
/// use browser_bunyan::fields;
/// let obj = fields! { "user" => "alice", "id" => 7 };
/// assert_eq!(obj.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::FieldObject::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::FieldObject::new()$(.with_field($key, $value))+
    };
}
