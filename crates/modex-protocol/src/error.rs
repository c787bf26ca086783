//! Protocol error types.

use modex_core::IdentifierError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Response body could not be interpreted.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A required key is absent from a response.
    #[error("missing field in response: {0}")]
    MissingField(&'static str),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary payload length differs from the expected element count.
    #[error("payload size mismatch: expected {expected} bytes, got {received}")]
    SizeMismatch { expected: usize, received: usize },

    /// Identifier fields are invalid.
    #[error("invalid session identifier: {0}")]
    Identifier(#[from] IdentifierError),
}

impl ProtocolError {
    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Returns true for errors caused by a malformed response.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::MissingField(_) | Self::Json(_) | Self::Identifier(_)
        )
    }
}
