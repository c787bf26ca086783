//! Session and variable addressing types.
//!
//! A [`SessionIdentifier`] names one exchange session on the server. It is
//! built by the caller (or returned from `create_session`) and then passed by
//! reference into every request touching that session. A [`VariableRef`]
//! narrows it down to a single array slot.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of an instance token, in bytes.
pub const MAX_INSTANCE_ID_LEN: usize = 35;

/// Separator used by the positional (comma) rendering of an identifier.
pub const FIELD_SEPARATOR: char = ',';

/// Errors raised while building identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Instance token exceeds [`MAX_INSTANCE_ID_LEN`].
    #[error("instance id too long: {len} bytes (max: {max})")]
    InstanceIdTooLong { len: usize, max: usize },

    /// Instance token contains the positional separator.
    #[error("instance id must not contain ',': {0:?}")]
    InstanceIdHasSeparator(String),

    /// Instance token contains a control or non-ASCII character.
    #[error("instance id must be printable ASCII: {0:?}")]
    InstanceIdNotPrintable(String),
}

/// Opaque token identifying one instantiation of a session.
///
/// Historically called `client_id` on the JSON wire. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceId(String);

impl InstanceId {
    /// Validates and wraps a token.
    pub fn new(token: impl Into<String>) -> Result<Self, IdentifierError> {
        let token = token.into();
        if token.len() > MAX_INSTANCE_ID_LEN {
            return Err(IdentifierError::InstanceIdTooLong {
                len: token.len(),
                max: MAX_INSTANCE_ID_LEN,
            });
        }
        if token.contains(FIELD_SEPARATOR) {
            return Err(IdentifierError::InstanceIdHasSeparator(token));
        }
        // The token is sent verbatim as a header value.
        if !token.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) {
            return Err(IdentifierError::InstanceIdNotPrintable(token));
        }
        Ok(Self(token))
    }

    /// The empty token.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no token is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for InstanceId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InstanceId> for String {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one exchange session.
///
/// Field order is significant: every wire rendering emits the fields in
/// declaration order. The `instance_id` field travels as `client_id` in JSON
/// bodies; `instance_id` is accepted as an alias when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentifier {
    /// Model producing data.
    pub source_model_id: i32,
    /// Model consuming data.
    pub destination_model_id: i32,
    /// Participant that created the session.
    pub initiator_id: i32,
    /// Participant expected to join.
    pub invitee_id: i32,
    /// Server-assigned instance token.
    #[serde(rename = "client_id", alias = "instance_id")]
    pub instance_id: InstanceId,
}

impl SessionIdentifier {
    /// Creates an identifier with an empty instance token.
    pub fn new(
        source_model_id: i32,
        destination_model_id: i32,
        initiator_id: i32,
        invitee_id: i32,
    ) -> Self {
        Self {
            source_model_id,
            destination_model_id,
            initiator_id,
            invitee_id,
            instance_id: InstanceId::empty(),
        }
    }

    /// Sets the instance token.
    pub fn with_instance_id(mut self, instance_id: InstanceId) -> Self {
        self.instance_id = instance_id;
        self
    }

    /// Addresses one variable within this session.
    pub fn variable(&self, variable_id: i32) -> VariableRef {
        VariableRef::new(self.clone(), variable_id)
    }

    /// Returns true if `user_id` is one of the two participants.
    pub fn is_participant(&self, user_id: i32) -> bool {
        user_id == self.initiator_id || user_id == self.invitee_id
    }
}

/// Positional form: `source,destination,initiator,invitee,instance`.
///
/// The trailing component is always present, even when empty.
impl fmt::Display for SessionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.source_model_id,
            self.destination_model_id,
            self.initiator_id,
            self.invitee_id,
            self.instance_id
        )
    }
}

/// One array slot within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    /// Owning session.
    pub session: SessionIdentifier,
    /// Variable id within the session.
    pub variable_id: i32,
}

impl VariableRef {
    /// Creates a variable reference.
    pub fn new(session: SessionIdentifier, variable_id: i32) -> Self {
        Self {
            session,
            variable_id,
        }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.session, self.variable_id)
    }
}
