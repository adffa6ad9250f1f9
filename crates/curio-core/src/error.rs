//! Error types for the Curio respondent client.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for every Curio crate.
///
/// Variants follow the failure taxonomy of a response session: resolution and
/// creation failures, stream failures, submission failures and purely local
/// validation failures. All of them are cloneable so they can be forwarded to
/// a front end as events.
#[derive(Error, Debug, Clone, Serialize, PartialEq, Eq)]
pub enum CurioError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Transport-level failure (connection refused, timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Remote store answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required question has no answer; never reaches the network.
    #[error("Question '{question_id}' requires an answer")]
    Validation { question_id: String },

    /// The response session could not be created for this visit.
    #[error("Cannot start session: {0}")]
    SessionStart(String),

    /// The conversation stream failed mid-read.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Final answers could not be submitted; the session stays in progress.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// The conversation state machine rejected an event.
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CurioError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an Http error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Validation error for an unanswered question
    pub fn validation(question_id: impl Into<String>) -> Self {
        Self::Validation {
            question_id: question_id.into(),
        }
    }

    /// Creates a Stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from the transport or the remote store.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http { .. })
    }

    /// Check if this is a local validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CurioError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CurioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CurioError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CurioError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for CurioError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {}", err))
    }
}

/// A type alias for `Result<T, CurioError>`.
pub type Result<T> = std::result::Result<T, CurioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(CurioError::not_found("response_session", "7").is_not_found());
        assert!(CurioError::network("reset").is_network());
        assert!(CurioError::http(503, "unavailable").is_network());
        assert!(CurioError::validation("q1").is_validation());
        assert!(!CurioError::stream("eof").is_network());
    }

    #[test]
    fn test_display() {
        let err = CurioError::SessionStart("HTTP 500: boom".to_string());
        assert_eq!(err.to_string(), "Cannot start session: HTTP 500: boom");
    }
}
