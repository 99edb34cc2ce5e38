//! Log level definitions
//!
//! Levels are plain integers so that a stream can be silenced with any value
//! above [`Level::FATAL`]. The six canonical levels carry names; resolution from
//! a name is case-insensitive and never fails loudly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric severity. Lower values are more verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(i64);

impl Level {
    pub const TRACE: Level = Level(10);
    pub const DEBUG: Level = Level(20);
    pub const INFO: Level = Level(30);
    pub const WARN: Level = Level(40);
    pub const ERROR: Level = Level(50);
    pub const FATAL: Level = Level(60);

    /// Threshold of a root logger before any stream is attached.
    pub const UNSET: Level = Level(i64::MAX);

    /// The canonical levels, most verbose first.
    pub const ALL: [Level; 6] = [
        Level::TRACE,
        Level::DEBUG,
        Level::INFO,
        Level::WARN,
        Level::ERROR,
        Level::FATAL,
    ];

    #[inline]
    pub const fn new(value: i64) -> Self {
        Level(value)
    }

    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Lowercase name of a canonical level, `None` for any other value.
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            10 => Some("trace"),
            20 => Some("debug"),
            30 => Some("info"),
            40 => Some("warn"),
            50 => Some("error"),
            60 => Some("fatal"),
            _ => None,
        }
    }

    /// Case-insensitive lookup of a canonical level name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            "fatal" => Some(Level::FATAL),
            _ => None,
        }
    }

    pub fn is_canonical(self) -> bool {
        self.name().is_some()
    }

    /// Terminal color used by the formatted console stream, bucketed by range.
    #[cfg(feature = "console")]
    pub fn color_code(self) -> colored::Color {
        use colored::Color::*;
        if self < Level::DEBUG {
            Magenta
        } else if self < Level::INFO {
            Yellow
        } else if self < Level::WARN {
            Cyan
        } else if self < Level::ERROR {
            BrightMagenta
        } else if self < Level::FATAL {
            Red
        } else {
            BrightRed
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name.to_ascii_uppercase()),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    /// Accepts a canonical name (any case) or a plain integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(level) = Level::from_name(s) {
            return Ok(level);
        }
        s.trim()
            .parse::<i64>()
            .map(Level)
            .map_err(|_| format!("Invalid log level: '{}'", s))
    }
}

impl From<i64> for Level {
    fn from(value: i64) -> Self {
        Level(value)
    }
}

/// A level as supplied by configuration: a number or a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelSpec {
    Number(i64),
    Name(String),
}

impl LevelSpec {
    pub fn resolve(&self) -> Option<Level> {
        match self {
            LevelSpec::Number(n) => Some(Level(*n)),
            LevelSpec::Name(name) => Level::from_name(name),
        }
    }
}

impl From<Level> for LevelSpec {
    fn from(level: Level) -> Self {
        LevelSpec::Number(level.0)
    }
}

impl From<i64> for LevelSpec {
    fn from(n: i64) -> Self {
        LevelSpec::Number(n)
    }
}

impl From<i32> for LevelSpec {
    fn from(n: i32) -> Self {
        LevelSpec::Number(n as i64)
    }
}

impl From<&str> for LevelSpec {
    fn from(s: &str) -> Self {
        LevelSpec::Name(s.to_string())
    }
}

impl From<String> for LevelSpec {
    fn from(s: String) -> Self {
        LevelSpec::Name(s)
    }
}

/// Resolve a level number or name to a level.
///
/// Unknown names resolve to `None`. Every threshold comparison against `None`
/// is false: a stream at `None` receives nothing and a logger at `None`
/// reports every level as disabled.
pub fn resolve_level(spec: impl Into<LevelSpec>) -> Option<Level> {
    spec.into().resolve()
}

/// Lowercase name for a canonical level.
pub fn name_from_level(level: Level) -> Option<&'static str> {
    level.name()
}

/// `threshold <= level`, false for an unresolved threshold.
#[inline]
pub(crate) fn admits(threshold: Option<Level>, level: Level) -> bool {
    matches!(threshold, Some(t) if t <= level)
}
