//! Shared error types for AgentNet.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for AgentNet.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentNetError {
    /// Unknown agent id, tool, or relay target.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An ACTIVE agent with this id is already registered.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad or missing tool parameters, or a malformed message.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The message type has no handler.
    #[error("Unsupported message type: {0}")]
    UnsupportedType(String),

    /// An outbound call exceeded its deadline.
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// The peer could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The peer answered with a non-success status.
    #[error("Remote error {status}: {body}")]
    Remote {
        /// HTTP status returned by the peer.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Every permitted attempt failed.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Total attempts made.
        attempts: u32,
        /// Description of the final failure.
        last: String,
    },

    /// The registry detected an invariant violation. Fatal.
    #[error("Registry corrupted: {0}")]
    RegistryCorrupted(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentNetError {
    /// Stable snake_case tag used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentNetError::NotFound(_) => "not_found",
            AgentNetError::Conflict(_) => "conflict",
            AgentNetError::Validation(_) => "validation_error",
            AgentNetError::UnsupportedType(_) => "unsupported_type",
            AgentNetError::Timeout(_) => "timeout",
            AgentNetError::Connection(_) => "connection_error",
            AgentNetError::Remote { .. } => "remote_error",
            AgentNetError::RetriesExhausted { .. } => "retries_exhausted",
            AgentNetError::RegistryCorrupted(_) => "registry_corrupted",
            AgentNetError::Config(_) => "config_error",
            AgentNetError::Serialization(_) => "serialization_error",
            AgentNetError::Internal(_) => "internal_error",
        }
    }

    /// Wrap the error in its wire representation.
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            AgentNetError::NotFound(m)
            | AgentNetError::Conflict(m)
            | AgentNetError::Validation(m)
            | AgentNetError::UnsupportedType(m)
            | AgentNetError::Connection(m)
            | AgentNetError::RegistryCorrupted(m)
            | AgentNetError::Config(m)
            | AgentNetError::Serialization(m)
            | AgentNetError::Internal(m) => m.clone(),
            other => other.to_string(),
        };
        ErrorBody {
            error: ErrorDetail {
                kind: self.kind().to_string(),
                message,
            },
        }
    }

    /// Rebuild a caller-facing error from a peer's error body.
    ///
    /// Kinds that describe the caller's request (not found, conflict,
    /// validation, unsupported type) are restored; anything else stays a
    /// [`AgentNetError::Remote`] carrying the original status.
    pub fn from_remote(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => {
                let message = parsed.error.message;
                match parsed.error.kind.as_str() {
                    "not_found" => AgentNetError::NotFound(message),
                    "conflict" => AgentNetError::Conflict(message),
                    "validation_error" => AgentNetError::Validation(message),
                    "unsupported_type" => AgentNetError::UnsupportedType(message),
                    _ => AgentNetError::Remote {
                        status,
                        body: body.to_string(),
                    },
                }
            }
            Err(_) => AgentNetError::Remote {
                status,
                body: body.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for AgentNetError {
    fn from(e: serde_json::Error) -> Self {
        AgentNetError::Serialization(e.to_string())
    }
}

/// JSON error envelope: `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner part of [`ErrorBody`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// Alias for Result with AgentNetError.
pub type AgentNetResult<T> = Result<T, AgentNetError>;
