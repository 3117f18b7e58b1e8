//! Call policies applied around a single provider call
//!
//! The translator never retries or throttles on its own; callers build a
//! [`CallPolicy`] and pass it to the `*_with_policy` methods.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::errors::{Result, TranslationError};

/// Exponential backoff for retryable errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default delay cap
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    /// Set the delay cap
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32, error: &TranslationError) -> Duration {
        if let TranslationError::RateLimitError {
            retry_after: Some(secs),
            ..
        } = error
        {
            return Duration::from_secs(*secs).min(self.max_delay);
        }
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Shared cap on in-flight provider calls
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    /// Allow at most `max_concurrent` calls at once
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|e| TranslationError::InternalError(e.to_string()))
    }
}

/// Retry, concurrency and pacing applied at one call site
#[derive(Debug, Clone, Default)]
pub struct CallPolicy {
    /// Backoff for retryable errors
    pub retry: Option<RetryPolicy>,
    /// Shared in-flight cap
    pub limiter: Option<ConcurrencyLimiter>,
    /// Pause before every attempt
    pub delay: Option<Duration>,
}

impl CallPolicy {
    /// Single attempt, no limiting
    pub fn none() -> Self {
        Self::default()
    }

    /// Retry with `retry`
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Hold a permit of `limiter` for each attempt
    pub fn with_limiter(mut self, limiter: ConcurrencyLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Wait `delay` before each attempt
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Run `op`, re-invoking it for retryable errors while the retry budget lasts
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.retry.as_ref().map_or(0, |r| r.max_retries);
        let mut attempt = 0;

        loop {
            let result = {
                let _permit = match &self.limiter {
                    Some(limiter) => Some(limiter.acquire().await?),
                    None => None,
                };
                if let Some(delay) = self.delay {
                    sleep(delay).await;
                }
                op().await
            };

            match result {
                Ok(value) => {
                    if attempt > 0 {
                        info!("Successfully translated after {} retries", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    let backoff = self
                        .retry
                        .as_ref()
                        .map(|r| r.delay_for(attempt, &e))
                        .unwrap_or_default();
                    warn!("Attempt {} failed: {}, retrying in {:?}", attempt, e, backoff);
                    sleep(backoff).await;
                }
                Err(e) => {
                    debug!("Giving up after {} retries: {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
