//! Model client with pruning and deterministic retry.

use crate::interfaces::{ModelBackend, ModelRequest, ModelTurn, RuntimeError};
use crate::pruner::ContextPruner;
use crate::types::Transcript;
use pagepilot_tools::ToolSpec;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero behaves as one.
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay before attempt `failed + 1`.
    pub fn delay_after(&self, failed: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(failed.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

pub struct ModelClient<B: ModelBackend> {
    backend: B,
    pruner: ContextPruner,
    retry: RetryPolicy,
    system_prompt: String,
}

impl<B: ModelBackend> ModelClient<B> {
    pub fn new(backend: B, system_prompt: impl Into<String>) -> Self {
        Self {
            backend,
            pruner: ContextPruner::default(),
            retry: RetryPolicy::default(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_pruner(mut self, pruner: ContextPruner) -> Self {
        self.pruner = pruner;
        self
    }

    /// Send a pruned copy of `transcript`, retrying transient failures.
    ///
    /// # Errors
    /// Fatal errors return at once. Any other error that outlasts the retry
    /// ceiling returns `RetriesExhausted` with the last underlying error.
    pub async fn send(
        &self,
        transcript: &Transcript,
        tools: &[ToolSpec],
        keep_images: Option<usize>,
    ) -> Result<ModelTurn, RuntimeError> {
        let _timer = crate::metrics::MetricTimer::new("model_request_latency");

        let request = ModelRequest {
            system_prompt: self.system_prompt.clone(),
            transcript: self.pruner.prune(transcript, keep_images),
            tools: tools.to_vec(),
        };

        let attempts = self.retry.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("Model call attempt {}/{}", attempt, attempts);

            let error = match self.backend.send(&request).await {
                Ok(turn) => return Ok(turn),
                Err(e) if !e.is_retryable() => {
                    warn!("Model call failed with non-retryable error: {}", e);
                    return Err(e);
                }
                Err(e) => e,
            };

            if attempt >= attempts {
                warn!("Model call failed after {} attempts: {}", attempt, error);
                return Err(RuntimeError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.retry.delay_after(attempt);
            warn!(
                "Model call failed (attempt {}), retrying in {:?}: {}",
                attempt, delay, error
            );
            crate::metrics::increment_model_retries();
            tokio::time::sleep(delay).await;
        }
    }
}
