/// Structured error types for expensectl-core.
///
/// Library consumers get composable `thiserror` enums; the binary wraps
/// them with `anyhow` context.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for expensectl-core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid config file {path:?}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Amount could not be parsed
    #[error("Invalid amount '{value}'")]
    InvalidAmount { value: String },

    /// Date could not be parsed
    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Result type alias for expensectl-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create an invalid amount error
    pub fn invalid_amount(value: impl Into<String>) -> Self {
        Self::InvalidAmount {
            value: value.into(),
        }
    }

    /// Create an invalid date error
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_amount("12,3x");
        assert_eq!(err.to_string(), "Invalid amount '12,3x'");

        let err = CoreError::invalid_date("2024-13-01");
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CoreError = io_err.into();

        assert!(matches!(err, CoreError::Io { .. }));
    }
}
