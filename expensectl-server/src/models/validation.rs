//! Field validation errors, surfaced to API clients as 400 responses.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Text with disallowed characters, e.g. a username with spaces
    #[error("{field}: {reason}")]
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Unknown choice such as a template kind
    #[error("invalid {field} value: '{value}'")]
    InvalidVariant { field: &'static str, value: String },

    /// Money or quantity that does not fit its column
    #[error("{field} {reason}")]
    OutOfRange { field: &'static str, reason: &'static str },
}
