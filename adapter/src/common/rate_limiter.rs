use governor::{
    Quota, RateLimiter as GovernorRateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Client-side throttle for outbound data API requests.
///
/// Cloning shares the underlying quota, so every transport built from the
/// same limiter draws from one budget.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<DirectLimiter>,
    requests_per_second: u32,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second`; zero is treated as one.
    pub fn new(requests_per_second: u32) -> Self {
        RateLimiterConfig {
            requests_per_second,
            burst_size: None,
        }
        .build()
    }

    /// Check if a request can proceed right now
    pub fn check(&self) -> Result<(), RateLimitError> {
        self.inner.check().map_err(|not_until| {
            let retry_after = not_until.wait_time_from(DefaultClock::default().now());
            RateLimitError::TooManyRequests { retry_after }
        })
    }

    /// Wait until a request can proceed
    pub async fn wait_until_ready(&self) {
        self.inner.until_ready().await;
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }
}

/// Rate limiting errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests { retry_after: Duration },
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Maximum burst size (defaults to requests_per_second)
    pub burst_size: Option<u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: None,
        }
    }
}

impl RateLimiterConfig {
    /// Create a rate limiter from this configuration
    pub fn build(&self) -> RateLimiter {
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = self
            .burst_size
            .and_then(NonZeroU32::new)
            .unwrap_or(rate);
        let quota = Quota::per_second(rate).allow_burst(burst);

        RateLimiter {
            inner: Arc::new(GovernorRateLimiter::direct(quota)),
            requests_per_second: rate.get(),
        }
    }
}
