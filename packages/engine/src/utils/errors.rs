// packages/engine/src/utils/errors.rs
//! Engine error types
//!
//! Only configuration, registration and operator-input problems are errors.
//! A candidate string without a recognized URL, or an inactive override,
//! is a normal outcome and never surfaces here.

use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by the interception engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The host-matching rule could not be compiled
    #[error("invalid match pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Arguments handed to an adapter do not fit its call shape
    #[error("argument shape mismatch for {point}: {reason}")]
    ShapeMismatch { point: String, reason: String },

    /// An interception point name the registry does not know
    #[error("unknown interception point: {0}")]
    UnknownInterceptionPoint(String),

    /// Operator asked for the custom server without configuring one
    #[error("server address is empty")]
    ServerAddressMissing,

    /// Persisted settings could not be read or written
    #[error("settings error: {0}")]
    Settings(String),

    /// TLS client configuration failure
    #[error("TLS error: {0}")]
    TlsError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<::config::ConfigError> for EngineError {
    fn from(err: ::config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

impl From<rustls::Error> for EngineError {
    fn from(err: rustls::Error) -> Self {
        EngineError::TlsError(err.to_string())
    }
}

impl EngineError {
    /// Build a shape mismatch error for the named interception point
    pub fn shape_mismatch(point: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::ShapeMismatch {
            point: point.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = EngineError::shape_mismatch("okhttp_url_parse", "expected 1 argument, got 2");
        assert_eq!(
            err.to_string(),
            "argument shape mismatch for okhttp_url_parse: expected 1 argument, got 2"
        );
    }

    #[test]
    fn test_regex_error_conversion() {
        let err: EngineError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, EngineError::InvalidPattern(_)));
    }
}
