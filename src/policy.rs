//! Execution policy (C10): timeout + retry-with-backoff applied around model
//! calls and tool invocations.
//!
//! Grounded in the donor SDK's `retry.rs` (`RetryConfig`,
//! `retry_with_backoff_conditional`, `is_retryable_error`) almost unchanged —
//! renamed to match the spec's `ExecutionConfig` vocabulary, with `timeout`
//! promoted to a first-class field (wrapped via `tokio::time::timeout`, as
//! the donor's own `AgentError::Timeout` variant already anticipated) and a
//! second preset, [`ExecutionConfig::tool_defaults`], for tool invocations.

use crate::error::AgentError;
use crate::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Timeout + retry-with-backoff parameters for one class of operation (model
/// calls or tool invocations each get their own preset).
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Per-attempt deadline. Exceeding it counts as a transient failure.
    pub timeout: Duration,
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling on the computed delay, before jitter.
    pub max_backoff: Duration,
    /// Multiplier applied to the backoff after each failed attempt.
    pub backoff_multiplier: f64,
    /// Fraction of the computed delay randomized in either direction (0..1).
    pub jitter_factor: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl ExecutionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for model calls: generous timeout, moderate retry budget.
    pub fn model_defaults() -> Self {
        Self::default()
    }

    /// Preset for tool invocations: shorter timeout and backoff, since tools
    /// are typically local and should fail fast.
    pub fn tool_defaults() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    pub fn with_max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter_factor(mut self, jitter: f64) -> Self {
        self.jitter_factor = jitter.clamp(0.0, 1.0);
        self
    }

    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_backoff.as_millis() as f64);
        let jitter_span = capped_ms * self.jitter_factor;
        let jitter = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
        Duration::from_millis((capped_ms + jitter).max(0.0) as u64)
    }
}

/// Run `operation`, retrying on a retryable [`AgentError`] up to
/// `config.max_attempts` times, sleeping an exponential backoff (with
/// jitter) between attempts, and enforcing `config.timeout` per attempt.
///
/// A non-retryable error (per [`AgentError::is_retryable`]) or the final
/// attempt's error is returned immediately.
pub async fn retry_with_backoff<F, Fut, T>(config: &ExecutionConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = AgentError::Timeout;

    for attempt in 0..config.max_attempts {
        let attempt_result = tokio::time::timeout(config.timeout, operation()).await;

        match attempt_result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                if !err.is_retryable() || attempt + 1 >= config.max_attempts {
                    return Err(err);
                }
                last_error = err;
            }
            Err(_elapsed) => {
                if attempt + 1 >= config.max_attempts {
                    return Err(AgentError::Timeout);
                }
                last_error = AgentError::Timeout;
            }
        }

        tracing::warn!(attempt = attempt + 1, max_attempts = config.max_attempts, error = %last_error, "retrying after transient failure");
        tokio::time::sleep(config.backoff_for_attempt(attempt)).await;
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn tool_defaults_are_tighter_than_model_defaults() {
        let model = ExecutionConfig::model_defaults();
        let tool = ExecutionConfig::tool_defaults();
        assert!(tool.timeout < model.timeout);
        assert!(tool.max_attempts <= model.max_attempts);
    }

    #[test]
    fn jitter_factor_is_clamped() {
        let config = ExecutionConfig::new().with_jitter_factor(5.0);
        assert_eq!(config.jitter_factor, 1.0);
        let config = ExecutionConfig::new().with_jitter_factor(-5.0);
        assert_eq!(config.jitter_factor, 0.0);
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_attempt() {
        let config = ExecutionConfig::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<i32> = retry_with_backoff(&config, || {
            let calls2 = calls2.clone();
            async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retryable_errors_up_to_max_attempts() {
        let config = ExecutionConfig::new()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(1))
            .with_max_backoff(Duration::from_millis(2));
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<i32> = retry_with_backoff(&config, || {
            let calls2 = calls2.clone();
            async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Err(AgentError::provider("503 unavailable"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let config = ExecutionConfig::new().with_max_attempts(5);
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<i32> = retry_with_backoff(&config, || {
            let calls2 = calls2.clone();
            async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Err(AgentError::invalid_input("bad request"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_retryable_transient_failure() {
        let config = ExecutionConfig::new()
            .with_timeout(Duration::from_millis(5))
            .with_max_attempts(2)
            .with_initial_backoff(Duration::from_millis(1))
            .with_max_backoff(Duration::from_millis(2));
        let result: Result<i32> = retry_with_backoff(&config, || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(1)
        })
        .await;
        assert!(matches!(result, Err(AgentError::Timeout)));
    }
}
