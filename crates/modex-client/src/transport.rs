//! HTTP transport.
//!
//! The [`HttpEngine`] trait is the seam between the session client and the
//! network. [`ReqwestEngine`] is the production engine; tests plug in
//! in-memory engines that answer from a table.
//!
//! [`Transport`] adds the parts every exchange call shares: a per-request
//! timeout, status checking, and exact-length binary reads.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{ClientError, ClientResult};

/// Default timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent by the shared engine.
pub const DEFAULT_USER_AGENT: &str = concat!("modex/", env!("CARGO_PKG_VERSION"));

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// HTTP method used by the exchange protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request handed to an [`HttpEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Creates a POST request with the given body.
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response without headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Creates a 200 response with a JSON body.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string()).with_header("content-type", "application/json")
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts a non-success response into the matching error.
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, &self.body))
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Executes HTTP requests.
///
/// Implementations must be safe to share between tasks; the session client
/// issues concurrent calls through one engine.
pub trait HttpEngine: Send + Sync {
    /// Returns a short name for logging.
    fn name(&self) -> &str;

    /// Sends a request and reads the whole response.
    ///
    /// Non-success statuses are returned as responses, not errors.
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>>;
}

/// Engine backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestEngine {
    client: reqwest::Client,
}

static SHARED_CLIENT: OnceLock<Result<reqwest::Client, String>> = OnceLock::new();

impl ReqwestEngine {
    /// Builds an engine with its own connection pool.
    pub fn new(user_agent: &str) -> ClientResult<Self> {
        let client = build_client(user_agent).map_err(ClientError::EngineInit)?;
        Ok(Self { client })
    }

    /// Returns an engine on the process-wide connection pool.
    ///
    /// The pool is built once on first use; a failed build is remembered.
    pub fn shared() -> ClientResult<Self> {
        let client = SHARED_CLIENT
            .get_or_init(|| build_client(DEFAULT_USER_AGENT))
            .as_ref()
            .map_err(|e| ClientError::EngineInit(e.clone()))?;
        Ok(Self {
            client: client.clone(),
        })
    }
}

fn build_client(user_agent: &str) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| e.to_string())
}

impl HttpEngine for ReqwestEngine {
    fn name(&self) -> &str {
        "reqwest"
    }

    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if request.method == HttpMethod::Post {
                builder = builder.body(request.body);
            }

            let mut response = builder.send().await.map_err(map_reqwest_error)?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect();

            let hint = response.content_length().unwrap_or(0).min(MAX_PREALLOC);
            let mut body = Vec::with_capacity(hint as usize);
            while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
                body.extend_from_slice(&chunk);
            }

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

/// Upper bound on the buffer reserved from a `Content-Length` header.
const MAX_PREALLOC: u64 = 1 << 20;

fn map_reqwest_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout {
            operation: e
                .url()
                .map(|u| u.path().to_string())
                .unwrap_or_else(|| "request".to_string()),
        }
    } else if e.is_connect() {
        ClientError::Transport(format!("connection failed: {}", e))
    } else {
        ClientError::Transport(format!("request failed: {}", e))
    }
}

/// Engine plus timeout, with the request shapes the protocol uses.
#[derive(Clone)]
pub struct Transport {
    engine: Arc<dyn HttpEngine>,
    timeout: Option<Duration>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("engine", &self.engine.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Transport {
    /// Creates a transport with the default timeout.
    pub fn new(engine: Arc<dyn HttpEngine>) -> Self {
        Self {
            engine,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Sets the per-request timeout. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the engine name.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// POSTs a JSON body.
    ///
    /// Non-success statuses are returned, not raised.
    pub async fn post_json<T>(&self, url: &str, body: &T) -> ClientResult<HttpResponse>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ClientError::InvalidInput(format!("failed to encode body: {}", e)))?;
        let request = HttpRequest::post(url, bytes).header("Content-Type", "application/json");
        self.send(request).await
    }

    /// POSTs raw bytes with extra headers.
    ///
    /// Non-success statuses are raised as errors.
    pub async fn post_binary(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
        bytes: Vec<u8>,
    ) -> ClientResult<()> {
        let mut request =
            HttpRequest::post(url, bytes).header("Content-Type", "application/octet-stream");
        request.headers.extend(headers);
        self.send(request).await?.error_for_status()?;
        Ok(())
    }

    /// GETs a URL.
    ///
    /// Non-success statuses are returned, not raised.
    pub async fn get(&self, url: &str) -> ClientResult<HttpResponse> {
        self.send(HttpRequest::get(url)).await
    }

    /// GETs a binary body that must be exactly `expected` bytes long.
    pub async fn get_binary_exact(&self, url: &str, expected: usize) -> ClientResult<Vec<u8>> {
        let response = self.get(url).await?.error_for_status()?;
        exact_body(response, expected)
    }

    /// POSTs a JSON body and reads a binary body of exactly `expected` bytes.
    pub async fn post_json_binary_exact<T>(
        &self,
        url: &str,
        body: &T,
        expected: usize,
    ) -> ClientResult<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let response = self.post_json(url, body).await?.error_for_status()?;
        exact_body(response, expected)
    }

    async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        trace!(%method, url = %url, bytes = request.body.len(), "sending request");

        let call = self.engine.execute(request);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                debug!(%method, url = %url, ?limit, "request timed out");
                ClientError::Timeout {
                    operation: format!("{} {}", method, url),
                }
            })??,
            None => call.await?,
        };

        trace!(
            %method,
            url = %url,
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );
        Ok(response)
    }
}

fn exact_body(response: HttpResponse, expected: usize) -> ClientResult<Vec<u8>> {
    if response.body.len() != expected {
        return Err(ClientError::SizeMismatch {
            expected,
            received: response.body.len(),
        });
    }
    Ok(response.body)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory engines for tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Engine answering from a queue and recording every request.
    #[derive(Default)]
    pub struct ScriptedEngine {
        responses: Mutex<VecDeque<ClientResult<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedEngine {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn push(&self, response: HttpResponse) {
            self.responses.lock().unwrap().push_back(Ok(response));
        }

        pub fn push_err(&self, err: ClientError) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl HttpEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn execute(&self, request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>> {
            self.requests.lock().unwrap().push(request);
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(500, "no scripted response")));
            Box::pin(async move { next })
        }
    }

    /// Engine that never answers.
    pub struct StalledEngine;

    impl HttpEngine for StalledEngine {
        fn name(&self) -> &str {
            "stalled"
        }

        fn execute(&self, _request: HttpRequest) -> BoxFuture<'_, ClientResult<HttpResponse>> {
            Box::pin(std::future::pending())
        }
    }
}
