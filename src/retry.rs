//! Retry policy for the Store Gateway: transient failures are retried
//! exactly once by callers that have no side effect, then surfaced.

use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::store::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub delay: Duration,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::storage()
    }
}

impl RetryConfig {
    pub fn storage() -> Self {
        Self {
            delay: Duration::from_millis(25),
            jitter_factor: 0.2,
        }
    }
}

/// Retries a store operation exactly once if its first attempt fails with
/// `StoreError::Transient`. Any other error, or a second failure, is
/// surfaced to the caller unchanged.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub async fn retry_once_on_transient<T, F, Fut>(&self, operation_name: &str, operation: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        match operation().await {
            Ok(value) => Ok(value),
            Err(StoreError::Transient(message)) => {
                warn!(operation = operation_name, error = %message, "transient store failure, retrying once");
                sleep(self.jittered_delay()).await;
                operation().await
            }
            Err(other) => Err(other),
        }
    }

    fn jittered_delay(&self) -> Duration {
        let base = self.config.delay;
        if self.config.jitter_factor <= 0.0 {
            return base;
        }
        let jitter_ms = (base.as_millis() as f64 * self.config.jitter_factor) as u64;
        let extra = if jitter_ms == 0 { 0 } else { rand::random::<u64>() % jitter_ms };
        base + Duration::from_millis(extra)
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
