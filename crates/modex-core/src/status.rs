//! Server-side session lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a session as reported by the server.
///
/// The server answers `get_session_status` with a bare integer; the mapping
/// below is the one the exchange server uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Reserved error marker (`-1`).
    Error,
    /// Unknown or unrecognised code (`0`).
    #[default]
    Unknown,
    /// Created, only the initiator is present (`1`).
    Created,
    /// Both participants joined (`2`).
    Active,
    /// One participant ended the session (`3`).
    PartialEnd,
    /// Both participants ended; the session is about to be dropped (`4`).
    End,
}

impl SessionStatus {
    /// Maps a wire code to a status. Unrecognised codes map to `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::Error,
            1 => Self::Created,
            2 => Self::Active,
            3 => Self::PartialEnd,
            4 => Self::End,
            _ => Self::Unknown,
        }
    }

    /// Returns the wire code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Error => -1,
            Self::Unknown => 0,
            Self::Created => 1,
            Self::Active => 2,
            Self::PartialEnd => 3,
            Self::End => 4,
        }
    }

    /// Returns true while data may still be exchanged.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Created | Self::Active)
    }

    /// Returns a short name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Unknown => "unknown",
            Self::Created => "created",
            Self::Active => "active",
            Self::PartialEnd => "partial_end",
            Self::End => "end",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw status code together with its decoded meaning.
///
/// The code is kept because the server may grow states this client does not
/// know about yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    /// Integer sent by the server.
    pub code: i32,
    /// Decoded status.
    pub status: SessionStatus,
}

impl StatusReport {
    /// Builds a report from a wire code.
    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            status: SessionStatus::from_code(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for status in [
            SessionStatus::Error,
            SessionStatus::Unknown,
            SessionStatus::Created,
            SessionStatus::Active,
            SessionStatus::PartialEnd,
            SessionStatus::End,
        ] {
            assert_eq!(SessionStatus::from_code(status.code()), status);
        }
    }

    #[test]
    fn unknown_code_keeps_raw_value() {
        let report = StatusReport::from_code(42);
        assert_eq!(report.code, 42);
        assert_eq!(report.status, SessionStatus::Unknown);
    }

    #[test]
    fn open_states() {
        assert!(SessionStatus::Created.is_open());
        assert!(SessionStatus::Active.is_open());
        assert!(!SessionStatus::PartialEnd.is_open());
        assert!(!SessionStatus::End.is_open());
    }

    #[test]
    fn display() {
        assert_eq!(SessionStatus::PartialEnd.to_string(), "partial_end");
    }
}
