//! Request and response bodies exchanged with the session server.

use modex_core::SessionIdentifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

/// Declaration of one variable slot: its id and element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Variable id.
    pub id: i32,
    /// Number of f64 elements.
    pub size: i32,
}

impl VariableSpec {
    /// Creates a variable declaration.
    pub fn new(id: i32, size: i32) -> Self {
        Self { id, size }
    }
}

/// Body of `POST /create_session`.
///
/// Variable ids and sizes travel as parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub source_model_id: i32,
    pub destination_model_id: i32,
    pub initiator_id: i32,
    pub invitee_id: i32,
    #[serde(default)]
    pub input_variables_id: Vec<i32>,
    #[serde(default)]
    pub input_variables_size: Vec<i32>,
    #[serde(default)]
    pub output_variables_id: Vec<i32>,
    #[serde(default)]
    pub output_variables_size: Vec<i32>,
}

impl CreateSessionRequest {
    /// Creates a request with no variables declared.
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
            ..Self::default()
        }
    }

    /// Declares an input variable.
    pub fn input(mut self, spec: VariableSpec) -> Self {
        self.input_variables_id.push(spec.id);
        self.input_variables_size.push(spec.size);
        self
    }

    /// Declares an output variable.
    pub fn output(mut self, spec: VariableSpec) -> Self {
        self.output_variables_id.push(spec.id);
        self.output_variables_size.push(spec.size);
        self
    }

    /// Declares several input variables.
    pub fn inputs(self, specs: impl IntoIterator<Item = VariableSpec>) -> Self {
        specs.into_iter().fold(self, Self::input)
    }

    /// Declares several output variables.
    pub fn outputs(self, specs: impl IntoIterator<Item = VariableSpec>) -> Self {
        specs.into_iter().fold(self, Self::output)
    }

    /// Identifier this request will produce, before the server assigns an
    /// instance token.
    pub fn identifier(&self) -> SessionIdentifier {
        SessionIdentifier::new(
            self.source_model_id,
            self.destination_model_id,
            self.initiator_id,
            self.invitee_id,
        )
    }

    /// Checks that ids and sizes line up.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.input_variables_id.len() != self.input_variables_size.len() {
            return Err(ProtocolError::decode(
                "input variable ids and sizes differ in length",
            ));
        }
        if self.output_variables_id.len() != self.output_variables_size.len() {
            return Err(ProtocolError::decode(
                "output variable ids and sizes differ in length",
            ));
        }
        if let Some(size) = self
            .input_variables_size
            .iter()
            .chain(&self.output_variables_size)
            .find(|size| **size < 0)
        {
            return Err(ProtocolError::decode(format!(
                "negative variable size: {}",
                size
            )));
        }
        Ok(())
    }
}

/// Body of `POST /join_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSessionRequest {
    pub session_id: SessionIdentifier,
    pub invitee_id: i32,
}

/// Body of the JSON variant of `POST /receive_data`.
///
/// `param_id` is the variable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRequest {
    pub session_id: SessionIdentifier,
    pub param_id: i32,
}

/// Body of `POST /end_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSessionRequest {
    pub session_id: SessionIdentifier,
    pub user_id: i32,
}

/// Response of `GET /get_variable_flag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_id: Option<i32>,
    pub flag_status: i32,
}

/// Response of `GET /get_variable_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_id: Option<i32>,
    pub size: i32,
}

/// Free-form acknowledgement or error body.
///
/// Successful calls answer with `{"status": ...}`; rejected ones with
/// `{"detail": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ServerMessage {
    /// Parses a body, falling back to an empty message for anything that is
    /// not a JSON object.
    pub fn parse_lenient(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Status as text, if present.
    pub fn status_text(&self) -> Option<String> {
        self.status.as_ref().map(value_text)
    }

    /// Detail as text, if present.
    pub fn detail_text(&self) -> Option<String> {
        self.detail.as_ref().map(value_text)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decodes a `{"flag_status": N}` body.
pub fn decode_flag(body: &[u8]) -> ProtocolResult<i32> {
    let response: FlagResponse = serde_json::from_slice(body)?;
    Ok(response.flag_status)
}

/// Decodes a `{"size": N}` body.
pub fn decode_size(body: &[u8]) -> ProtocolResult<i32> {
    let response: SizeResponse = serde_json::from_slice(body)?;
    Ok(response.size)
}

/// Decodes a session status body.
///
/// The server answers with a bare integer, either as plain text or as a JSON
/// number. `{"status": N}` is accepted too.
pub fn decode_status(body: &[u8]) -> ProtocolResult<i32> {
    let text = std::str::from_utf8(body)
        .map_err(|e| ProtocolError::decode(format!("status body is not UTF-8: {}", e)))?
        .trim();

    if let Ok(code) = text.parse::<i32>() {
        return Ok(code);
    }

    let value: Value = serde_json::from_str(text)?;
    let number = match &value {
        Value::Object(map) => map.get("status"),
        other => Some(other),
    };

    number
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| ProtocolError::decode(format!("status is not an integer: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modex_core::InstanceId;

    fn session() -> SessionIdentifier {
        SessionIdentifier::new(1, 2, 3, 4).with_instance_id(InstanceId::new("abc").unwrap())
    }

    #[test]
    fn create_request_wire_shape() {
        let request = CreateSessionRequest::new(2001, 2005, 35, 38)
            .inputs([VariableSpec::new(1, 50), VariableSpec::new(2, 10)])
            .output(VariableSpec::new(4, 50));
        insta::assert_snapshot!(
            serde_json::to_string(&request).unwrap(),
            @r#"{"source_model_id":2001,"destination_model_id":2005,"initiator_id":35,"invitee_id":38,"input_variables_id":[1,2],"input_variables_size":[50,10],"output_variables_id":[4],"output_variables_size":[50]}"#
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn create_request_validation() {
        let mut request = CreateSessionRequest::new(1, 2, 3, 4).input(VariableSpec::new(1, 5));
        request.input_variables_size.clear();
        assert!(request.validate().is_err());

        let negative = CreateSessionRequest::new(1, 2, 3, 4).output(VariableSpec::new(1, -5));
        assert!(negative.validate().is_err());
    }

    #[test]
    fn create_request_identifier_has_empty_instance() {
        let id = CreateSessionRequest::new(1, 2, 3, 4).identifier();
        assert!(id.instance_id.is_empty());
    }

    #[test]
    fn join_request_wire_shape() {
        let request = JoinSessionRequest {
            session_id: session(),
            invitee_id: 4,
        };
        insta::assert_snapshot!(
            serde_json::to_string(&request).unwrap(),
            @r#"{"session_id":{"source_model_id":1,"destination_model_id":2,"initiator_id":3,"invitee_id":4,"client_id":"abc"},"invitee_id":4}"#
        );
    }

    #[test]
    fn variable_request_uses_param_id() {
        let request = VariableRequest {
            session_id: session(),
            param_id: 9,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["param_id"], 9);
        assert_eq!(json["session_id"]["client_id"], "abc");
    }

    #[test]
    fn end_request_carries_user() {
        let request = EndSessionRequest {
            session_id: session(),
            user_id: 3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["user_id"], 3);
    }

    #[test]
    fn decode_flag_reads_key() {
        assert_eq!(decode_flag(br#"{"flag_status": 7}"#).unwrap(), 7);
        assert_eq!(decode_flag(br#"{"var_id": 3, "flag_status": 1}"#).unwrap(), 1);
        assert!(decode_flag(br#"{"var_id": 3}"#).is_err());
        assert!(decode_flag(b"garbage").is_err());
    }

    #[test]
    fn decode_size_reads_key() {
        assert_eq!(decode_size(br#"{"var_id": 3, "size": 50}"#).unwrap(), 50);
        assert!(decode_size(br#"{"detail": "Variable ID not found in session"}"#).is_err());
    }

    #[test]
    fn decode_status_forms() {
        assert_eq!(decode_status(b"2").unwrap(), 2);
        assert_eq!(decode_status(b" 3\n").unwrap(), 3);
        assert_eq!(decode_status(b"-1").unwrap(), -1);
        assert_eq!(decode_status(br#"{"status": 1}"#).unwrap(), 1);
        assert!(decode_status(br#""active""#).is_err());
        assert!(decode_status(b"").is_err());
    }

    #[test]
    fn server_message_lenient() {
        let message = ServerMessage::parse_lenient(br#"{"status":"Session ended successfully"}"#);
        assert_eq!(message.status_text().as_deref(), Some("Session ended successfully"));

        let message = ServerMessage::parse_lenient(br#"{"detail":"Session not found"}"#);
        assert_eq!(message.detail_text().as_deref(), Some("Session not found"));

        assert_eq!(ServerMessage::parse_lenient(b"<html>"), ServerMessage::default());
    }
}
