use super::errors::{DataApiError, ErrorKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Lower and upper multipliers applied to each backoff step.
pub const JITTER_MIN: f64 = 0.75;
pub const JITTER_MAX: f64 = 1.25;

/// Status codes retried when no explicit set is configured.
pub const DEFAULT_RETRYABLE_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Retry policy for a single HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub retryable_statuses: BTreeSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.iter().copied().collect(),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            ..Self::default()
        }
    }

    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Retry policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Runs async actions with bounded retries and jittered exponential backoff.
///
/// Attempts are numbered from zero. After a failure the error is classified:
/// an explicit `permanent` marker stops immediately, a status code is retried
/// only when it belongs to the configured set, and connection or timeout
/// failures are retried regardless of status. Everything else surfaces as-is.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Executes `action`, retrying retryable failures until the attempt
    /// ceiling of `max_retries + 1` is reached.
    ///
    /// # Errors
    ///
    /// Returns the last observed error once retries are exhausted or as soon
    /// as a non-retryable error is seen.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        context: &str,
        mut action: F,
    ) -> Result<T, DataApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DataApiError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match action().await {
                Ok(value) => {
                    if attempt > 0 {
                        log::info!("{context} succeeded after {attempt} retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.is_retryable(&error) {
                        log::debug!("{context} failed with non-retryable error: {error}");
                        return Err(error);
                    }

                    if attempt >= self.config.max_retries {
                        log::warn!(
                            "{context} failed after {} attempts: {error}",
                            attempt + 1
                        );
                        return Err(error);
                    }

                    let delay = self.backoff_delay(attempt);
                    log::warn!(
                        "{context} attempt {} failed ({error}), retrying in {delay:?}",
                        attempt + 1
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Decides whether `error` should be retried under this policy.
    pub fn is_retryable(&self, error: &DataApiError) -> bool {
        if error.permanent {
            return false;
        }

        if matches!(error.kind, ErrorKind::Network | ErrorKind::Timeout)
            || error.is_network_message()
            || error.is_timeout_message()
        {
            return true;
        }

        match error.status {
            Some(status) => self.config.retryable_statuses.contains(&status),
            None => false,
        }
    }

    /// Computes the jittered delay that follows the failed attempt `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
        self.backoff_delay_with_jitter(attempt, jitter)
    }

    pub(crate) fn backoff_delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let base = self.config.initial_delay.as_millis() as f64;
        let exponential = base * 2f64.powi(attempt.min(31) as i32) * jitter;
        let capped = exponential.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}
