//! Bounded exponential backoff for rate-limited requests

use crate::error::{DownloaderError, Result};
use std::future::Future;
use std::time::Duration;

/// Waits between attempts
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Real clock
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// `backoff_factor ^ attempt` seconds after each rate-limited attempt,
/// at most `max_retries` attempts in total
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub backoff_factor: f64,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_factor: 2.0,
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    pub fn new(backoff_factor: f64, max_retries: u32) -> Self {
        Self {
            backoff_factor,
            max_retries,
        }
    }

    /// Wait after the given 1-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds, fails with something other than a rate
    /// limit, or has been rate limited `max_retries` times.
    pub async fn run<T, F, Fut, S>(&self, sleeper: &S, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        S: Sleeper,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() => {
                    if attempt >= self.max_retries {
                        tracing::warn!(attempts = attempt, "rate limited, giving up");
                        return Err(DownloaderError::RetriesExhausted { attempts: attempt });
                    }
                    let delay = self.delay_for(attempt);
                    tracing::warn!(attempt, delay_secs = delay.as_secs_f64(), error = %e, "rate limited, backing off");
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
