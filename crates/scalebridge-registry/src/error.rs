//! Error types for event ingestion.

use thiserror::Error;

/// Result type alias for event parsing and ingestion.
pub type EventResult<T> = Result<T, EventError>;

/// Errors raised while turning loosely-typed input into an `UpdateEvent`.
///
/// Both variants are client errors: nothing has been applied when one
/// of them is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("invalid active parameter: {value:?} is not a boolean")]
    InvalidActive { value: String },

    #[error("invalid value parameter: {value:?} ({reason})")]
    InvalidValue { value: String, reason: String },
}

impl EventError {
    /// Name of the input parameter that failed to parse.
    pub fn parameter(&self) -> &'static str {
        match self {
            EventError::InvalidActive { .. } => "active",
            EventError::InvalidValue { .. } => "value",
        }
    }
}
