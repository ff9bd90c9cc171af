//! Sliding-window login-attempt throttle, keyed by client identity (username
//! or source IP, as configured by the caller).

use super::error::AuthError;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter backed by `DashMap`.
///
/// Each key maps to a `VecDeque<Instant>` recording recent attempt
/// timestamps. `check_rate_limit` trims the window before comparing the
/// count against the configured limit.
pub struct InMemoryRateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    cleanup_interval: Duration,
    window_duration: Duration,
}

impl InMemoryRateLimiter {
    /// Create a new rate limiter with the given cleanup interval and sliding
    /// window duration.
    pub fn new(cleanup_interval: Duration, window_duration: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            cleanup_interval,
            window_duration,
        }
    }

    /// Check whether `key` has exceeded `limit` attempts within the
    /// configured window. If allowed, records the attempt and returns
    /// `Ok(())`; otherwise returns `Err(AuthError::RateLimitExceeded)`.
    pub fn check_rate_limit(&self, key: &str, limit: u32) -> Result<(), AuthError> {
        let now = Instant::now();
        let window = self.window_duration;

        let mut entry = self.windows.entry(key.to_owned()).or_default();
        let timestamps = entry.value_mut();

        while let Some(&front) = timestamps.front() {
            if now.duration_since(front) > window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= limit as usize {
            return Err(AuthError::RateLimitExceeded);
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// Spawn a background task that periodically removes stale entries so
    /// memory usage stays bounded. Returns the `JoinHandle` so callers can
    /// abort it during shutdown.
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.cleanup_interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                self.cleanup();
            }
        })
    }

    /// Remove entries whose sliding windows are entirely expired.
    pub(crate) fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window_duration;

        self.windows.retain(|_key, timestamps| {
            while let Some(&front) = timestamps.front() {
                if now.duration_since(front) > window {
                    timestamps.pop_front();
                } else {
                    break;
                }
            }
            !timestamps.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> InMemoryRateLimiter {
        InMemoryRateLimiter::new(Duration::from_secs(60), Duration::from_secs(60))
    }

    #[test]
    fn allows_attempts_under_limit() {
        let limiter = limiter();
        for _ in 0..5 {
            assert!(limiter.check_rate_limit("alice", 10).is_ok());
        }
    }

    #[test]
    fn rejects_attempts_over_limit() {
        let limiter = limiter();
        for _ in 0..10 {
            limiter.check_rate_limit("alice", 10).unwrap();
        }
        let result = limiter.check_rate_limit("alice", 10);
        assert!(matches!(result.unwrap_err(), AuthError::RateLimitExceeded));
    }

    #[test]
    fn independent_limits_per_key() {
        let limiter = limiter();
        for _ in 0..5 {
            limiter.check_rate_limit("alice", 5).unwrap();
        }
        assert!(limiter.check_rate_limit("alice", 5).is_err());
        assert!(limiter.check_rate_limit("bob", 5).is_ok());
    }

    #[tokio::test]
    async fn cleanup_removes_expired_entries() {
        let limiter = InMemoryRateLimiter::new(Duration::from_secs(60), Duration::from_millis(1));
        limiter.check_rate_limit("alice", 100).unwrap();
        assert!(!limiter.windows.is_empty());
        tokio::time::sleep(Duration::from_millis(5)).await;
        limiter.cleanup();
        assert!(limiter.windows.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_rate_limit_enforcement() {
        let limiter = Arc::new(limiter());
        let limit: u32 = 30;
        let num_tasks: usize = 60;

        let mut handles = Vec::with_capacity(num_tasks);
        for _ in 0..num_tasks {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.check_rate_limit("contended", limit).is_ok()
            }));
        }

        let mut accepted = 0u32;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, limit);
    }
}
