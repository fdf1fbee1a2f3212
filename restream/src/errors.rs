//! Error types for restream.
//!
//! Failures coming out of a producer are never wrapped: they travel to the
//! consumer verbatim inside [`Completion::Failed`](crate::core::Completion).
//! [`RestreamError`] only covers the crate's own surfaces such as
//! configuration and logging setup.

use thiserror::Error;

/// Result alias for fallible restream operations.
pub type Result<T> = std::result::Result<T, RestreamError>;

/// The main error type for restream operations.
#[derive(Debug, Error)]
pub enum RestreamError {
    /// A configuration value was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestreamError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns true if the error came from configuration validation.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = RestreamError::invalid_config("label must not be empty");
        assert_eq!(err.to_string(), "Invalid configuration: label must not be empty");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_from_serde_error() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: RestreamError = parse.unwrap_err().into();
        assert!(matches!(err, RestreamError::Serialization(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_internal_is_not_config() {
        let err = RestreamError::Internal("subscriber already set".into());
        assert!(!err.is_config_error());
        assert!(err.to_string().contains("subscriber already set"));
    }
}
