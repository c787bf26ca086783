//! Polling helpers.
//!
//! The exchange is flag driven: a producer may only send when the slot flag
//! is `0` and a consumer may only receive when it is `1`. These helpers wrap
//! the single-shot operations of [`SessionClient`] in bounded loops. Nothing
//! in the client retries on its own; callers opt in here.

use std::time::Duration;

use modex_core::{SessionIdentifier, VariableRef};
use modex_protocol::ArrayPayload;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::session::SessionClient;

/// Flag value of an empty slot.
pub const FLAG_EMPTY: i32 = 0;
/// Flag value of a slot holding data.
pub const FLAG_READY: i32 = 1;

/// Bounds for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, at least one is always made.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Errors that count as a failed attempt rather than ending the loop.
fn keeps_polling(err: &ClientError) -> bool {
    err.is_retryable() || err.is_not_found()
}

impl SessionClient {
    /// Joins a session, retrying transient failures.
    ///
    /// A 400 answer means the session is already active and is returned as
    /// is, without further attempts.
    pub async fn join_with_retries(
        &self,
        session: &SessionIdentifier,
        invitee_id: i32,
        policy: &RetryPolicy,
    ) -> ClientResult<()> {
        let attempts = policy.attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.join_session(session, invitee_id).await {
                Ok(()) => return Ok(()),
                Err(e @ ClientError::Rejected { status: 400, .. }) => {
                    info!(session = %session, error = %e, "join refused, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!(session = %session, attempt, attempts, error = %e, "join attempt failed");
                    last_error = e.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(policy.delay).await;
            }
        }

        Err(ClientError::RetriesExhausted {
            attempts,
            reason: last_error,
        })
    }

    /// Polls a variable flag until it equals `expected`.
    pub async fn wait_for_flag(
        &self,
        var: &VariableRef,
        expected: i32,
        policy: &RetryPolicy,
    ) -> ClientResult<()> {
        let attempts = policy.attempts();
        let mut last_seen = String::from("no answer");

        for attempt in 1..=attempts {
            match self.get_variable_flag(var).await {
                Ok(flag) if flag == expected => {
                    debug!(var = %var, flag, attempt, "flag reached");
                    return Ok(());
                }
                Ok(flag) => {
                    debug!(var = %var, flag, expected, attempt, "flag not ready");
                    last_seen = format!("flag is {}, waiting for {}", flag, expected);
                }
                Err(e) if keeps_polling(&e) => {
                    debug!(var = %var, attempt, error = %e, "flag unavailable");
                    last_seen = e.to_string();
                }
                Err(e) => return Err(e),
            }
            if attempt < attempts {
                tokio::time::sleep(policy.delay).await;
            }
        }

        warn!(var = %var, expected, attempts, "gave up waiting for flag");
        Err(ClientError::RetriesExhausted {
            attempts,
            reason: last_seen,
        })
    }

    /// Waits for the slot to be empty, then sends once.
    pub async fn send_when_ready(
        &self,
        var: &VariableRef,
        data: &[f64],
        policy: &RetryPolicy,
    ) -> ClientResult<()> {
        self.wait_for_flag(var, FLAG_EMPTY, policy).await?;
        self.send_data(var, data).await
    }

    /// Waits for data, reads its size, then receives it.
    pub async fn receive_when_ready(
        &self,
        var: &VariableRef,
        policy: &RetryPolicy,
    ) -> ClientResult<ArrayPayload> {
        self.wait_for_flag(var, FLAG_READY, policy).await?;
        let size = self.get_variable_size(var).await?;
        let n = usize::try_from(size)
            .map_err(|_| ClientError::Decode(format!("negative variable size: {}", size)))?;
        self.receive_data(var, n).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::HttpResponse;
    use crate::transport::testing::ScriptedEngine;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(10))
    }

    fn flag(value: i32) -> HttpResponse {
        HttpResponse::json(&serde_json::json!({"var_id": 1, "flag_status": value}))
    }

    fn session() -> SessionIdentifier {
        SessionIdentifier::new(2001, 2005, 35, 38)
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_flag_stops_after_max_attempts() {
        let engine = ScriptedEngine::new();
        for _ in 0..5 {
            engine.push(flag(0));
        }
        let client = SessionClient::with_engine("http://poll.test", engine.clone());

        let err = client
            .wait_for_flag(&session().variable(1), FLAG_READY, &quick(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exhausted);
        assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(engine.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_flag_tolerates_not_found() {
        let engine = ScriptedEngine::new();
        engine.push(HttpResponse::new(404, r#"{"detail":"Variable not found"}"#));
        engine.push(flag(1));
        let client = SessionClient::with_engine("http://poll.test", engine.clone());

        client
            .wait_for_flag(&session().variable(1), FLAG_READY, &quick(3))
            .await
            .unwrap();
        assert_eq!(engine.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_flag_propagates_decode_errors() {
        let engine = ScriptedEngine::new();
        engine.push(HttpResponse::json(&serde_json::json!({"var_id": 1})));
        let client = SessionClient::with_engine("http://poll.test", engine.clone());

        let err = client
            .wait_for_flag(&session().variable(1), FLAG_READY, &quick(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(engine.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn join_stops_on_already_active() {
        let engine = ScriptedEngine::new();
        engine.push_err(ClientError::Transport("refused".into()));
        engine.push(HttpResponse::new(
            400,
            r#"{"detail":"Session is already active"}"#,
        ));
        engine.push(HttpResponse::new(200, "{}"));
        let client = SessionClient::with_engine("http://poll.test", engine.clone());

        let err = client
            .join_with_retries(&session(), 38, &quick(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected { status: 400, .. }));
        assert_eq!(engine.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn join_exhausts_attempts() {
        let engine = ScriptedEngine::new();
        for _ in 0..2 {
            engine.push(HttpResponse::new(503, "unavailable"));
        }
        let client = SessionClient::with_engine("http://poll.test", engine);

        let err = client
            .join_with_retries(&session(), 38, &quick(2))
            .await
            .unwrap_err();
        let ClientError::RetriesExhausted { attempts, reason } = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempts, 2);
        assert!(reason.contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn send_when_ready_waits_for_empty_slot() {
        let engine = ScriptedEngine::new();
        engine.push(flag(1));
        engine.push(flag(0));
        engine.push(HttpResponse::new(200, "{}"));
        let client = SessionClient::with_engine("http://poll.test", engine.clone());

        client
            .send_when_ready(&session().variable(1), &[2.0, 3.0], &quick(4))
            .await
            .unwrap();

        let requests = engine.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].url.ends_with("/send_data"));
        assert_eq!(requests[2].body.len(), 16);
    }

    #[tokio::test(start_paused = true)]
    async fn receive_when_ready_uses_reported_size() {
        let engine = ScriptedEngine::new();
        engine.push(flag(1));
        engine.push(HttpResponse::json(&serde_json::json!({"var_id": 1, "size": 2})));
        engine.push(HttpResponse::new(200, ArrayPayload::encode(&[0.25, -8.0])));
        let client = SessionClient::with_engine("http://poll.test", engine);

        let payload = client
            .receive_when_ready(&session().variable(1), &quick(2))
            .await
            .unwrap();
        assert_eq!(payload.into_inner(), vec![0.25, -8.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_size_is_decode_error() {
        let engine = ScriptedEngine::new();
        engine.push(flag(1));
        engine.push(HttpResponse::json(&serde_json::json!({"size": -1})));
        let client = SessionClient::with_engine("http://poll.test", engine);

        let err = client
            .receive_when_ready(&session().variable(1), &quick(2))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }
}
