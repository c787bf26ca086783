//! Sentinel-returning facade.
//!
//! Some callers are written against integer return codes instead of typed
//! errors. [`LegacyClient`] wraps [`SessionClient`] and folds every failure
//! into those codes after logging it. New code should use [`SessionClient`]
//! directly.

use modex_core::{SessionIdentifier, VariableRef};
use modex_protocol::{ArrayPayload, CreateSessionRequest};
use tracing::{error, info, warn};

use crate::error::ClientError;
use crate::session::SessionClient;

/// `send_data` succeeded.
pub const SEND_OK: i32 = 1;
/// `send_data` failed in transport or was rejected.
pub const SEND_FAILED: i32 = 0;
/// The HTTP engine could not be initialized.
pub const SEND_ENGINE_ERROR: i32 = -1;
/// Flag or size is unavailable.
pub const VALUE_UNAVAILABLE: i32 = -1;
/// Status code reported when the status could not be read.
pub const STATUS_UNKNOWN: i32 = 0;

/// Client returning sentinel values.
#[derive(Debug, Clone)]
pub struct LegacyClient {
    inner: Option<SessionClient>,
}

impl LegacyClient {
    /// Creates a client on the shared HTTP engine.
    ///
    /// An engine failure is logged and every later call reports failure.
    pub fn new(base_url: impl Into<String>) -> Self {
        match SessionClient::new(base_url) {
            Ok(client) => Self::from_client(client),
            Err(e) => {
                error!(error = %e, "HTTP engine unavailable");
                Self { inner: None }
            }
        }
    }

    /// Wraps an existing client.
    pub fn from_client(client: SessionClient) -> Self {
        Self {
            inner: Some(client),
        }
    }

    /// Returns the wrapped client, if the engine initialized.
    pub fn client(&self) -> Option<&SessionClient> {
        self.inner.as_ref()
    }

    /// Creates a session. `None` on any failure.
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Option<SessionIdentifier> {
        let client = self.inner.as_ref()?;
        client
            .create_session(request)
            .await
            .inspect_err(|e| warn!(error = %e, "create_session failed"))
            .ok()
    }

    /// Joins a session. `true` on success.
    pub async fn join_session(&self, session: &SessionIdentifier, invitee_id: i32) -> bool {
        let Some(client) = &self.inner else {
            return false;
        };
        match client.join_session(session, invitee_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(session = %session, error = %e, "join_session failed");
                false
            }
        }
    }

    /// Reads the raw status code, [`STATUS_UNKNOWN`] on any failure.
    pub async fn get_session_status(&self, session: &SessionIdentifier) -> i32 {
        let Some(client) = &self.inner else {
            return STATUS_UNKNOWN;
        };
        match client.get_session_status(session).await {
            Ok(report) => report.code,
            Err(e) => {
                warn!(session = %session, error = %e, "get_session_status failed");
                STATUS_UNKNOWN
            }
        }
    }

    /// Reads a variable flag, [`VALUE_UNAVAILABLE`] on absence or error.
    pub async fn get_variable_flag(&self, var: &VariableRef) -> i32 {
        let Some(client) = &self.inner else {
            return VALUE_UNAVAILABLE;
        };
        match client.get_variable_flag(var).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(var = %var, error = %e, "get_variable_flag failed");
                VALUE_UNAVAILABLE
            }
        }
    }

    /// Reads a variable size, [`VALUE_UNAVAILABLE`] on absence or error.
    pub async fn get_variable_size(&self, var: &VariableRef) -> i32 {
        let Some(client) = &self.inner else {
            return VALUE_UNAVAILABLE;
        };
        match client.get_variable_size(var).await {
            Ok(size) => size,
            Err(e) => {
                warn!(var = %var, error = %e, "get_variable_size failed");
                VALUE_UNAVAILABLE
            }
        }
    }

    /// Sends an array: [`SEND_OK`], [`SEND_FAILED`] or [`SEND_ENGINE_ERROR`].
    pub async fn send_data(&self, var: &VariableRef, data: &[f64]) -> i32 {
        let Some(client) = &self.inner else {
            return SEND_ENGINE_ERROR;
        };
        match client.send_data(var, data).await {
            Ok(()) => SEND_OK,
            Err(ClientError::EngineInit(e)) => {
                error!(var = %var, error = %e, "HTTP engine unavailable");
                SEND_ENGINE_ERROR
            }
            Err(e) => {
                warn!(var = %var, error = %e, "send_data failed");
                SEND_FAILED
            }
        }
    }

    /// Receives exactly `n` elements. `None` on any failure.
    pub async fn receive_data(&self, var: &VariableRef, n: usize) -> Option<ArrayPayload> {
        let client = self.inner.as_ref()?;
        client
            .receive_data(var, n)
            .await
            .inspect_err(|e| warn!(var = %var, error = %e, "receive_data failed"))
            .ok()
    }

    /// Ends the session. Failures are only logged.
    pub async fn end_session(&self, session: &SessionIdentifier, user_id: i32) {
        let Some(client) = &self.inner else {
            warn!(session = %session, "end_session skipped, no HTTP engine");
            return;
        };
        match client.end_session(session, user_id).await {
            Ok(outcome) => info!(
                session = %session,
                user_id,
                message = outcome.message.as_deref().unwrap_or(""),
                "end_session acknowledged"
            ),
            Err(e) => warn!(session = %session, user_id, error = %e, "end_session failed"),
        }
    }
}
