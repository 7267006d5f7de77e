/*!
 * Retry logic with exponential backoff
 *
 * Retries wrap a whole transfer. The copier never retries internally; a
 * partially written destination is simply rewritten by the next attempt.
 */

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::TransferConfig;
use crate::error::{ArtshipError, Result};

/// How long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub attempts: u32,
    pub delay: Duration,
    pub exponential_backoff: bool,
    /// Extra random delay as a fraction of the computed delay (0.0 disables)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
            exponential_backoff: true,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once
    pub fn none() -> Self {
        Self {
            attempts: 0,
            ..Self::default()
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            attempts: config.retry_attempts,
            delay: Duration::from_secs(config.retry_delay_secs),
            exponential_backoff: config.exponential_backoff,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = if self.exponential_backoff {
            self.delay
                .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
        } else {
            self.delay
        };

        if self.jitter > 0.0 && !base.is_zero() {
            let factor = rand::rng().random_range(0.0..self.jitter);
            base + Duration::from_secs_f64(base.as_secs_f64() * factor)
        } else {
            base
        }
    }
}

/// Run `operation`, retrying transient failures according to `policy`
pub fn with_retry<T, F>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            warn!(
                "Retry attempt {} of {} after {:?}...",
                attempt, policy.attempts, delay
            );
            thread::sleep(delay);
        }

        match operation() {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() || policy.attempts == 0 => return Err(e),
            Err(e) if attempt >= policy.attempts => {
                return Err(ArtshipError::RetriesExhausted {
                    attempts: policy.attempts,
                    last_error: Box::new(e),
                })
            }
            Err(e) => {
                warn!("Transfer attempt failed: {}", e);
                attempt += 1;
            }
        }
    }
}
