//! HTTP endpoint table.
//!
//! Paths are relative to the server base URL. Deployments of the exchange
//! server have renamed some routes over time (`/get_specific_session_status`
//! for instance), so the table can be overridden from configuration.

use serde::{Deserialize, Serialize};

/// One server route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CreateSession,
    JoinSession,
    SessionStatus,
    VariableFlag,
    VariableSize,
    SendData,
    ReceiveData,
    EndSession,
}

impl Endpoint {
    /// Returns the default path of this route.
    pub fn default_path(&self) -> &'static str {
        match self {
            Self::CreateSession => "/create_session",
            Self::JoinSession => "/join_session",
            Self::SessionStatus => "/get_session_status",
            Self::VariableFlag => "/get_variable_flag",
            Self::VariableSize => "/get_variable_size",
            Self::SendData => "/send_data",
            Self::ReceiveData => "/receive_data",
            Self::EndSession => "/end_session",
        }
    }
}

/// Paths for every route, overridable per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub create_session: String,
    pub join_session: String,
    pub session_status: String,
    pub variable_flag: String,
    pub variable_size: String,
    pub send_data: String,
    pub receive_data: String,
    pub end_session: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            create_session: Endpoint::CreateSession.default_path().to_string(),
            join_session: Endpoint::JoinSession.default_path().to_string(),
            session_status: Endpoint::SessionStatus.default_path().to_string(),
            variable_flag: Endpoint::VariableFlag.default_path().to_string(),
            variable_size: Endpoint::VariableSize.default_path().to_string(),
            send_data: Endpoint::SendData.default_path().to_string(),
            receive_data: Endpoint::ReceiveData.default_path().to_string(),
            end_session: Endpoint::EndSession.default_path().to_string(),
        }
    }
}

impl EndpointPaths {
    /// Returns the configured path of a route.
    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::CreateSession => &self.create_session,
            Endpoint::JoinSession => &self.join_session,
            Endpoint::SessionStatus => &self.session_status,
            Endpoint::VariableFlag => &self.variable_flag,
            Endpoint::VariableSize => &self.variable_size,
            Endpoint::SendData => &self.send_data,
            Endpoint::ReceiveData => &self.receive_data,
            Endpoint::EndSession => &self.end_session,
        }
    }

    /// Joins a route onto a base URL, tolerating slashes on either side.
    pub fn url(&self, base_url: &str, endpoint: Endpoint) -> String {
        join_url(base_url, self.path(endpoint))
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
