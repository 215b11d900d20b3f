//! Bounded retry with exponential backoff.
//!
//! Every outbound call to the trust center and to the downstream persistence
//! target goes through this policy: transient failures retry a fixed number of
//! times with backoff, permanent failures surface immediately. After
//! exhaustion the surrounding stage applies its own containment policy.

use std::fmt;
use std::future::Future;

use serde::Deserialize;
use tokio::time::{sleep, Duration};

/// Classifies an error as transient (retryable) or permanent.
///
/// Transient: I/O failures and server-side errors. Permanent: client errors
/// and malformed content, which will not get better by asking again.
pub trait RetryClassify {
    fn is_transient(&self) -> bool;
}

/// Retry policy configuration. Deserializable so agents can tune the bounds
/// from their YAML config; every field falls back to the default policy.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "defaults::max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "defaults::exponential_base")]
    pub exponential_base: f64,
}

mod defaults {
    pub fn max_retries() -> u32 {
        3
    }
    pub fn base_delay_ms() -> u64 {
        100
    }
    pub fn max_delay_ms() -> u64 {
        10_000
    }
    pub fn exponential_base() -> f64 {
        2.0
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 10_000,
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries; failures surface on first occurrence.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
            exponential_base: 2.0,
        }
    }

    /// Backoff delay before the given retry attempt (1-based).
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }
        let delay = self.base_delay_ms as f64 * self.exponential_base.powi(attempt as i32 - 1);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    /// Runs `op`, retrying transient failures up to the configured bound.
    ///
    /// Permanent failures are returned immediately without consuming the
    /// retry budget; the final transient failure is returned once the budget
    /// is exhausted.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryClassify + fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, "transient failure, retrying: {e}");
                    sleep(self.delay_for_attempt(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
