//! Resilient Executor: drives one logical request through the
//! acquire → call → extract → classify → rotate/back off loop.
//!
//! Policy asymmetry:
//! - rate-limited with more than one credential: rotate immediately, no delay
//!   (the next credential has its own quota);
//! - transient upstream failure, or rate-limited with a single credential:
//!   exponential backoff `base * 2^(attempt-1)`;
//! - unusable output (no JSON / wrong shape): retry immediately;
//! - fatal: stop on the attempt it occurs.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::llm_client::classifier::{classify, AttemptError, Classification};
use crate::llm_client::extractor::{extract, ShapeContract};
use crate::llm_client::pool::{Credential, CredentialPool};
use crate::llm_client::provider::{AiProvider, Prompt, ProviderError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    /// Upper bound on a single outbound call.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay applied after a failed `attempt` (1-based): 1x, 2x, 4x, ... the base.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

/// One caller-visible invocation of the gateway.
#[derive(Debug, Clone)]
pub struct LogicalRequest {
    pub prompt: Prompt,
    pub contract: ShapeContract,
    /// Overrides the policy's attempt budget when set.
    pub max_attempts: Option<u32>,
}

impl LogicalRequest {
    pub fn new(prompt: Prompt, contract: ShapeContract) -> Self {
        Self {
            prompt,
            contract,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// A validated result and the attempt that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fulfilled {
    pub value: Value,
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request rejected by upstream on attempt {attempt}: {source}")]
    Fatal {
        attempt: u32,
        #[source]
        source: AttemptError,
    },

    #[error("all {attempts} attempts failed; last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },

    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    #[error("validated output could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// True when every attempt produced output but the last one broke its shape contract.
    pub fn is_shape_exhaustion(&self) -> bool {
        matches!(
            self,
            GatewayError::Exhausted {
                last: AttemptError::Extraction(e),
                ..
            } if e.is_shape_violation()
        )
    }
}

/// The AI Provider Gateway. Owns the credential pool; shared across
/// handlers behind an `Arc`.
pub struct Gateway {
    provider: Arc<dyn AiProvider>,
    pool: CredentialPool,
    policy: RetryPolicy,
}

impl Gateway {
    pub fn new(provider: Arc<dyn AiProvider>, pool: CredentialPool, policy: RetryPolicy) -> Self {
        Self {
            provider,
            pool,
            policy,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Runs the retry loop until a validated value, a fatal error, exhaustion
    /// of the attempt budget, or cancellation.
    pub async fn execute(
        &self,
        request: LogicalRequest,
        cancel: &CancellationToken,
    ) -> Result<Fulfilled, GatewayError> {
        let max_attempts = request
            .max_attempts
            .unwrap_or(self.policy.max_attempts)
            .max(1);
        let span = info_span!(
            "ai_request",
            request_id = %Uuid::new_v4(),
            max_attempts,
            contract = request.contract.description()
        );

        self.run(&request, max_attempts, cancel)
            .instrument(span)
            .await
    }

    /// Like [`Gateway::execute`], additionally requiring the value to
    /// deserialize into `T` (a decode failure is retried like any shape violation).
    pub async fn execute_as<T: DeserializeOwned + 'static>(
        &self,
        mut request: LogicalRequest,
        cancel: &CancellationToken,
    ) -> Result<T, GatewayError> {
        request.contract = request.contract.and(ShapeContract::typed::<T>());
        let fulfilled = self.execute(request, cancel).await?;
        debug!(attempts = fulfilled.attempts, "Decoding validated AI value");
        Ok(serde_json::from_value(fulfilled.value)?)
    }

    async fn run(
        &self,
        request: &LogicalRequest,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<Fulfilled, GatewayError> {
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                info!(attempts = attempt - 1, "AI request cancelled before attempt");
                return Err(GatewayError::Cancelled {
                    attempts: attempt - 1,
                });
            }

            let credential = self.pool.acquire();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(attempt, credential = %credential, "AI request cancelled mid-call");
                    return Err(GatewayError::Cancelled { attempts: attempt });
                }
                result = self.attempt(&credential, request) => result,
            };

            let error = match result {
                Ok(value) => {
                    info!(
                        attempt,
                        max_attempts,
                        credential = %credential,
                        outcome = "success",
                        "AI attempt succeeded"
                    );
                    return Ok(Fulfilled {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            let classification = classify(&error);
            warn!(
                attempt,
                max_attempts,
                credential = %credential,
                outcome = %classification,
                error = %error,
                "AI attempt failed"
            );

            if classification == Classification::Fatal {
                error!(attempt, "AI request rejected, not retrying");
                return Err(GatewayError::Fatal {
                    attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                error!(attempts = attempt, "AI request exhausted all attempts");
                return Err(GatewayError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            match self.delay_after(classification, &error, attempt) {
                Some(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            info!(attempts = attempt, "AI request cancelled during backoff");
                            return Err(GatewayError::Cancelled { attempts: attempt });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => debug!("Retrying immediately"),
            }

            attempt += 1;
        }
    }

    /// One outbound call plus extraction, bounded by the call timeout.
    async fn attempt(
        &self,
        credential: &Credential,
        request: &LogicalRequest,
    ) -> Result<Value, AttemptError> {
        let raw = tokio::time::timeout(
            self.policy.call_timeout,
            self.provider.call(credential, &request.prompt),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.policy.call_timeout))??;

        Ok(extract(&raw, &request.contract)?)
    }

    fn delay_after(
        &self,
        classification: Classification,
        error: &AttemptError,
        attempt: u32,
    ) -> Option<Duration> {
        match (classification, error) {
            (Classification::RateLimited, _) if self.pool.len() > 1 => None,
            (_, AttemptError::Extraction(_)) => None,
            _ => Some(self.policy.backoff_for(attempt)),
        }
    }
}
