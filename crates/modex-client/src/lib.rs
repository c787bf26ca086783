//! HTTP client for the model data exchange server.
//!
//! [`SessionClient`] performs one round trip per operation and returns typed
//! errors. [`LegacyClient`] folds those errors into integer sentinels, and
//! the polling helpers in [`poll`] add bounded waits on variable flags.
//!
//! ```rust,no_run
//! use modex_client::{RetryPolicy, SessionClient};
//! use modex_protocol::{CreateSessionRequest, VariableSpec};
//!
//! # async fn run() -> modex_client::ClientResult<()> {
//! let client = SessionClient::new("http://127.0.0.1:8000")?;
//! let request = CreateSessionRequest::new(2001, 2005, 35, 38)
//!     .input(VariableSpec::new(1, 3))
//!     .output(VariableSpec::new(4, 3));
//! let session = client.create_session(&request).await?;
//!
//! let var = session.variable(4);
//! client
//!     .send_when_ready(&var, &[1.5, -2.25, 0.0], &RetryPolicy::default())
//!     .await?;
//! client.end_session(&session, 35).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod legacy;
pub mod poll;
pub mod session;
pub mod transport;

pub use config::ExchangeConfig;
pub use error::{ClientError, ClientResult, ErrorKind};
pub use legacy::LegacyClient;
pub use poll::RetryPolicy;
pub use session::{EndSessionOutcome, ReceiveMode, SessionClient};
pub use transport::{HttpEngine, HttpRequest, HttpResponse, ReqwestEngine, Transport};
