//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid logger or stream configuration
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Serializer registration rejected
    #[error("invalid serializer for \"{field}\" field: {message}")]
    InvalidSerializer { field: String, message: String },

    /// No stream carries the requested name
    #[error("no stream with name \"{name}\"")]
    StreamNotFound { name: String },

    /// Stream index outside the attached streams
    #[error("invalid stream index: {index} (logger has {len} streams)")]
    StreamIndexOutOfRange { index: i64, len: usize },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Network transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an invalid serializer error
    pub fn serializer(field: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidSerializer {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a stream-not-found error
    pub fn stream_not_found(name: impl Into<String>) -> Self {
        LoggerError::StreamNotFound { name: name.into() }
    }

    /// Create a stream index error
    pub fn stream_index(index: i64, len: usize) -> Self {
        LoggerError::StreamIndexOutOfRange { index, len }
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        LoggerError::Transport(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error describes a configuration problem
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidConfiguration { .. } | LoggerError::InvalidSerializer { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("Logger", "options.name (string) is required");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert!(err.is_config());

        let err = LoggerError::stream_index(3, 1);
        assert!(matches!(err, LoggerError::StreamIndexOutOfRange { index: 3, len: 1 }));
        assert!(!err.is_config());
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::stream_not_found("audit");
        assert_eq!(err.to_string(), "no stream with name \"audit\"");

        let err = LoggerError::config("Logger", "cannot mix \"streams\" and \"stream\" options");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for Logger: cannot mix \"streams\" and \"stream\" options"
        );

        let err = LoggerError::serializer("err", "field name must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid serializer for \"err\" field: field name must not be empty"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: LoggerError = io_err.into();
        assert!(err.to_string().contains("pipe closed"));
    }
}
