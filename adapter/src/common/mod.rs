pub mod errors;
pub mod rate_limiter;
pub mod retry;

pub use errors::{DataApiError, DataApiResult, ErrorKind};
pub use rate_limiter::{RateLimitError, RateLimiter, RateLimiterConfig};
pub use retry::{RetryConfig, RetryExecutor};
