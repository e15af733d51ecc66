use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    config::Config,
    errors::Error,
    request::ApiCall,
    transport::{port::Transport, types::DeliveryResult},
    Result,
};

/// Fixed-delay retry policy.
///
/// `retries` extra attempts are made after the first one, each preceded by
/// the same `delay`. There is no overall deadline: the worst case is roughly
/// `(retries + 1) * timeout + retries * delay`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            retries: cfg.retry_attempts(),
            delay: cfg.retry_delay(),
        }
    }

    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    last_error: Option<Error>,
}

impl RetryState {
    fn exhausted(self, operation: &str) -> Error {
        let attempts = self.attempt + 1;
        match self.last_error {
            Some(Error::Transport { operation, message }) if attempts > 1 => Error::Transport {
                operation,
                message: format!("{message} (gave up after {attempts} attempts)"),
            },
            Some(other) => other,
            None => Error::transport(operation, "no attempt was made"),
        }
    }
}

/// Transport decorator that retries network-level failures.
///
/// Only [`Error::Transport`] is retried; API rejections and everything else
/// go straight back to the caller. A retried call may be delivered twice if
/// the first attempt reached Telegram but its reply was lost.
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait::async_trait]
impl Transport for RetryingTransport {
    async fn execute(&self, call: &ApiCall) -> Result<DeliveryResult> {
        let operation = call.method.as_str();
        let mut state = RetryState::default();

        loop {
            match self.inner.execute(call).await {
                Ok(res) => {
                    if state.attempt > 0 {
                        debug!(operation, attempt = state.attempt + 1, "succeeded after retry");
                    }
                    return Ok(res);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => state.last_error = Some(e),
            }

            if state.attempt >= self.policy.retries {
                return Err(state.exhausted(operation));
            }

            state.attempt += 1;
            if let Some(e) = &state.last_error {
                warn!(
                    operation,
                    attempt = state.attempt,
                    max_attempts = self.policy.retries + 1,
                    delay_ms = self.policy.delay.as_millis() as u64,
                    error = %e,
                    "transport failure, retrying"
                );
            }
            sleep(self.policy.delay).await;
        }
    }

    fn close(&self) {
        self.inner.close();
    }
}
