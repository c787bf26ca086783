//! Session protocol client.
//!
//! [`SessionClient`] maps each exchange operation onto one HTTP round trip.
//! It keeps no per-session state, so one client can be cloned freely and
//! shared between tasks.

use std::sync::Arc;
use std::time::Duration;

use modex_core::{SessionIdentifier, StatusReport, VariableRef};
use modex_protocol::codec::{
    self, SESSION_ID_HEADER, SESSION_ID_PARAM, VAR_ID_HEADER, VAR_ID_PARAM,
};
use modex_protocol::{
    ArrayPayload, CreateSessionRequest, Endpoint, EndpointPaths, EndSessionRequest,
    JoinSessionRequest, ServerMessage, VariableRequest, decode_flag, decode_size, decode_status,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpEngine, HttpResponse, ReqwestEngine, Transport};

/// How `receive_data` addresses the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveMode {
    /// `GET /receive_data?session_id=..&var_id=..`
    #[default]
    Query,
    /// `POST /receive_data` with a JSON body.
    JsonBody,
}

/// Server acknowledgement of `end_session`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndSessionOutcome {
    /// Status message, when the server sent one.
    pub message: Option<String>,
}

/// Client for the exchange server.
#[derive(Debug, Clone)]
pub struct SessionClient {
    transport: Transport,
    base_url: String,
    endpoints: Arc<EndpointPaths>,
    receive_mode: ReceiveMode,
}

impl SessionClient {
    /// Creates a client on the shared HTTP engine.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let engine = ReqwestEngine::shared()?;
        Ok(Self::with_engine(base_url, Arc::new(engine)))
    }

    /// Creates a client on the given engine.
    pub fn with_engine(base_url: impl Into<String>, engine: Arc<dyn HttpEngine>) -> Self {
        Self {
            transport: Transport::new(engine),
            base_url: base_url.into(),
            endpoints: Arc::new(EndpointPaths::default()),
            receive_mode: ReceiveMode::default(),
        }
    }

    /// Returns a copy of this client with another request timeout.
    ///
    /// `None` disables the timeout.
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        let mut client = self.clone();
        client.transport = client.transport.with_timeout(timeout);
        client
    }

    /// Sets how `receive_data` is sent.
    pub fn with_receive_mode(mut self, mode: ReceiveMode) -> Self {
        self.receive_mode = mode;
        self
    }

    /// Overrides the endpoint paths.
    pub fn with_endpoints(mut self, endpoints: EndpointPaths) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.transport.timeout()
    }

    pub fn receive_mode(&self) -> ReceiveMode {
        self.receive_mode
    }

    /// Creates a session and returns the identifier assigned by the server.
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> ClientResult<SessionIdentifier> {
        request
            .validate()
            .map_err(|e| ClientError::InvalidInput(e.to_string()))?;

        let url = self.url(Endpoint::CreateSession);
        debug!(
            source = request.source_model_id,
            destination = request.destination_model_id,
            inputs = request.input_variables_id.len(),
            outputs = request.output_variables_id.len(),
            "creating session"
        );

        let response = self.transport.post_json(&url, request).await?;
        let response = check(response, "create_session")?;
        let session = codec::from_json(&response.body)?;

        info!(session = %session, "session created");
        Ok(session)
    }

    /// Joins a session as the invitee.
    pub async fn join_session(
        &self,
        session: &SessionIdentifier,
        invitee_id: i32,
    ) -> ClientResult<()> {
        let url = self.url(Endpoint::JoinSession);
        let body = JoinSessionRequest {
            session_id: session.clone(),
            invitee_id,
        };
        debug!(session = %session, invitee_id, "joining session");

        let response = self.transport.post_json(&url, &body).await?;
        check(response, "join_session")?;

        info!(session = %session, invitee_id, "joined session");
        Ok(())
    }

    /// Reads the session status.
    pub async fn get_session_status(
        &self,
        session: &SessionIdentifier,
    ) -> ClientResult<StatusReport> {
        let url = format!(
            "{}?{}",
            self.url(Endpoint::SessionStatus),
            codec::to_query_string(session, SESSION_ID_PARAM)
        );
        debug!(session = %session, "getting session status");

        let response = self.transport.get(&url).await?;
        let response = check(response, "get_session_status")?;
        let report = StatusReport::from_code(decode_status(&response.body)?);

        debug!(
            session = %session,
            code = report.code,
            status = %report.status,
            "session status"
        );
        Ok(report)
    }

    /// Reads the flag of a variable: `0` slot free, `1` data present.
    pub async fn get_variable_flag(&self, var: &VariableRef) -> ClientResult<i32> {
        let url = self.variable_url(Endpoint::VariableFlag, var);
        debug!(var = %var, "getting variable flag");

        let response = self.transport.get(&url).await?;
        let response = check(response, "get_variable_flag")?;
        Ok(decode_flag(&response.body)?)
    }

    /// Reads the element count of a variable.
    pub async fn get_variable_size(&self, var: &VariableRef) -> ClientResult<i32> {
        let url = self.variable_url(Endpoint::VariableSize, var);
        debug!(var = %var, "getting variable size");

        let response = self.transport.get(&url).await?;
        let response = check(response, "get_variable_size")?;
        Ok(decode_size(&response.body)?)
    }

    /// Uploads an array into a variable slot.
    pub async fn send_data(&self, var: &VariableRef, data: &[f64]) -> ClientResult<()> {
        let url = self.url(Endpoint::SendData);
        let headers = vec![
            (
                SESSION_ID_HEADER.to_string(),
                codec::header_value(&var.session),
            ),
            (VAR_ID_HEADER.to_string(), var.variable_id.to_string()),
        ];
        debug!(var = %var, elements = data.len(), "sending data");

        self.transport
            .post_binary(&url, headers, ArrayPayload::encode(data))
            .await
            .inspect_err(|e| warn!(var = %var, error = %e, "send_data failed"))?;
        Ok(())
    }

    /// Downloads exactly `n` elements from a variable slot.
    pub async fn receive_data(&self, var: &VariableRef, n: usize) -> ClientResult<ArrayPayload> {
        let expected = ArrayPayload::byte_len(n);
        debug!(var = %var, elements = n, mode = ?self.receive_mode, "receiving data");

        let bytes = match self.receive_mode {
            ReceiveMode::Query => {
                let url = self.variable_url(Endpoint::ReceiveData, var);
                self.transport.get_binary_exact(&url, expected).await
            }
            ReceiveMode::JsonBody => {
                let url = self.url(Endpoint::ReceiveData);
                let body = VariableRequest {
                    session_id: var.session.clone(),
                    param_id: var.variable_id,
                };
                self.transport
                    .post_json_binary_exact(&url, &body, expected)
                    .await
            }
        }
        .inspect_err(|e| warn!(var = %var, error = %e, "receive_data failed"))?;

        Ok(ArrayPayload::decode_exact(&bytes, n)?)
    }

    /// Ends the session on behalf of one participant.
    pub async fn end_session(
        &self,
        session: &SessionIdentifier,
        user_id: i32,
    ) -> ClientResult<EndSessionOutcome> {
        let url = self.url(Endpoint::EndSession);
        let body = EndSessionRequest {
            session_id: session.clone(),
            user_id,
        };
        debug!(session = %session, user_id, "ending session");

        let response = self.transport.post_json(&url, &body).await?;
        let response = check(response, "end_session")?;
        let message = ServerMessage::parse_lenient(&response.body).status_text();

        info!(
            session = %session,
            user_id,
            message = message.as_deref().unwrap_or(""),
            "session ended"
        );
        Ok(EndSessionOutcome { message })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        self.endpoints.url(&self.base_url, endpoint)
    }

    fn variable_url(&self, endpoint: Endpoint, var: &VariableRef) -> String {
        format!(
            "{}?{}&{}={}",
            self.url(endpoint),
            codec::to_query_string(&var.session, SESSION_ID_PARAM),
            VAR_ID_PARAM,
            var.variable_id
        )
    }
}

/// Raises non-success responses, logging the rejection.
fn check(response: HttpResponse, operation: &str) -> ClientResult<HttpResponse> {
    response.error_for_status().inspect_err(|e| {
        warn!(operation, error = %e, "request rejected");
    })
}
