//! Session identifier codec.
//!
//! The exchange server addresses a session through three different wire
//! contexts:
//!
//! ```text
//! query   session_id=2001,2005,35,38,9312-abcd
//! header  Session-ID: 2001,2005,35,38,9312-abcd
//! JSON    {"source_model_id":2001,"destination_model_id":2005,
//!          "initiator_id":35,"invitee_id":38,"client_id":"9312-abcd"}
//! ```
//!
//! The positional forms always carry exactly five components in the order
//! above. An empty instance token still produces the trailing separator so
//! the position of every field stays stable.

use modex_core::{FIELD_SEPARATOR, InstanceId, SessionIdentifier};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

/// Query parameter carrying the identifier.
pub const SESSION_ID_PARAM: &str = "session_id";

/// Header carrying the identifier on binary uploads.
pub const SESSION_ID_HEADER: &str = "Session-ID";

/// Header carrying the variable id on binary uploads.
pub const VAR_ID_HEADER: &str = "Var-ID";

/// Query parameter carrying the variable id.
pub const VAR_ID_PARAM: &str = "var_id";

/// Number of components in the positional form.
pub const POSITIONAL_FIELDS: usize = 5;

/// Renders `<param_name>=<comma form>` for use in a URL query.
///
/// An empty `param_name` yields the bare comma form. The instance token is
/// percent-encoded; the separators are not.
pub fn to_query_string(id: &SessionIdentifier, param_name: &str) -> String {
    let value = format!(
        "{},{},{},{},{}",
        id.source_model_id,
        id.destination_model_id,
        id.initiator_id,
        id.invitee_id,
        urlencoding::encode(id.instance_id.as_str())
    );
    if param_name.is_empty() {
        value
    } else {
        format!("{}={}", param_name, value)
    }
}

/// Renders the full header line, `Session-ID: <comma form>`.
pub fn to_header_value(id: &SessionIdentifier) -> String {
    format!("{}: {}", SESSION_ID_HEADER, header_value(id))
}

/// Renders only the value part of the `Session-ID` header.
pub fn header_value(id: &SessionIdentifier) -> String {
    id.to_string()
}

/// Renders the identifier as a JSON object.
///
/// The instance token is emitted under its historical wire name `client_id`.
pub fn to_json(id: &SessionIdentifier) -> Value {
    serde_json::json!({
        "source_model_id": id.source_model_id,
        "destination_model_id": id.destination_model_id,
        "initiator_id": id.initiator_id,
        "invitee_id": id.invitee_id,
        "client_id": id.instance_id.as_str(),
    })
}

/// Decodes an identifier from a JSON body.
///
/// When the body has a top-level `session_id` key (as server responses do),
/// that value is decoded; otherwise the body itself must be the identifier
/// object. A string-valued `session_id` is parsed in the positional form.
/// All five fields are required.
pub fn from_json(body: &[u8]) -> ProtocolResult<SessionIdentifier> {
    let value: Value = serde_json::from_slice(body)?;
    from_value(value)
}

/// Same as [`from_json`] for an already parsed value.
pub fn from_value(value: Value) -> ProtocolResult<SessionIdentifier> {
    let Value::Object(mut map) = value else {
        return Err(ProtocolError::decode("expected a JSON object"));
    };

    match map.remove(SESSION_ID_PARAM) {
        Some(Value::Object(inner)) => Ok(serde_json::from_value(Value::Object(inner))?),
        Some(Value::String(positional)) => parse_session_string(&positional),
        Some(other) => Err(ProtocolError::decode(format!(
            "unexpected session_id value: {}",
            other
        ))),
        None if map.contains_key("source_model_id") => {
            Ok(serde_json::from_value(Value::Object(map))?)
        }
        None => Err(ProtocolError::MissingField(SESSION_ID_PARAM)),
    }
}

/// Parses the bare positional form produced by [`to_query_string`] with an
/// empty parameter name.
pub fn parse_session_string(s: &str) -> ProtocolResult<SessionIdentifier> {
    let parts: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
    if parts.len() != POSITIONAL_FIELDS {
        return Err(ProtocolError::decode(format!(
            "expected {} comma-separated fields, got {}",
            POSITIONAL_FIELDS,
            parts.len()
        )));
    }

    let int = |idx: usize, name: &str| -> ProtocolResult<i32> {
        parts[idx]
            .trim()
            .parse::<i32>()
            .map_err(|e| ProtocolError::decode(format!("invalid {}: {}", name, e)))
    };

    let instance = urlencoding::decode(parts[4].trim())
        .map_err(|e| ProtocolError::decode(format!("invalid instance id: {}", e)))?;

    Ok(SessionIdentifier {
        source_model_id: int(0, "source_model_id")?,
        destination_model_id: int(1, "destination_model_id")?,
        initiator_id: int(2, "initiator_id")?,
        invitee_id: int(3, "invitee_id")?,
        instance_id: InstanceId::new(instance.into_owned())?,
    })
}
