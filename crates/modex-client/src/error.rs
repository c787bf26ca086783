//! Client error types.

use std::fmt;

use modex_protocol::{ProtocolError, ServerMessage};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request did not complete (engine, network, timeout).
    Transport,
    /// The response could not be interpreted.
    Decode,
    /// A binary payload had the wrong length.
    SizeMismatch,
    /// The server does not know the session or variable.
    NotFound,
    /// The server refused the request.
    Rejected,
    /// The caller supplied invalid input or configuration.
    InvalidInput,
    /// A polling helper ran out of attempts.
    Exhausted,
}

impl ErrorKind {
    /// Returns a short name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::SizeMismatch => "size_mismatch",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
            Self::InvalidInput => "invalid_input",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP engine could not be set up.
    #[error("failed to initialize HTTP engine: {0}")]
    EngineInit(String),

    /// The request could not be sent or the response not read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not finish in time.
    #[error("timeout during {operation}")]
    Timeout { operation: String },

    /// The server answered 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server answered with another non-success status.
    #[error("request rejected with status {status}: {detail}")]
    Rejected { status: u16, detail: String },

    /// The response body was malformed.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A binary payload had the wrong length.
    #[error("payload size mismatch: expected {expected} bytes, got {received}")]
    SizeMismatch { expected: usize, received: usize },

    /// Caller input was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A polling helper gave up.
    #[error("gave up after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },
}

impl ClientError {
    /// Builds the error for a non-success HTTP response.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let detail = describe_body(body);
        if status == 404 {
            Self::NotFound(detail)
        } else {
            Self::Rejected { status, detail }
        }
    }

    /// Returns the coarse classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineInit(_) | Self::Transport(_) | Self::Timeout { .. } => ErrorKind::Transport,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Decode(_) => ErrorKind::Decode,
            Self::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Self::InvalidInput(_) | Self::Config(_) => ErrorKind::InvalidInput,
            Self::RetriesExhausted { .. } => ErrorKind::Exhausted,
        }
    }

    /// Returns true if the server reported the session or variable missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::SizeMismatch { expected, received } => {
                Self::SizeMismatch { expected, received }
            }
            other => Self::Decode(other.to_string()),
        }
    }
}

/// Longest body excerpt kept in error messages.
const MAX_DETAIL_LEN: usize = 200;

/// Extracts a readable reason from an error body.
///
/// Prefers the server's `detail` field and falls back to the raw text.
fn describe_body(body: &[u8]) -> String {
    if let Some(detail) = ServerMessage::parse_lenient(body).detail_text() {
        return detail;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "empty response body".to_string();
    }
    match text.char_indices().nth(MAX_DETAIL_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
