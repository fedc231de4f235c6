//! Hard bounds enforced by the configuration validator, plus the soft
//! thresholds above which a valid value still earns a warning.

/// Request timeout bounds (1 second to 5 minutes)
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;
pub const WARN_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Retry attempt bounds
pub const MAX_RETRIES: u32 = 10;
pub const WARN_RETRIES: u32 = 5;

/// Retry delay bounds (100ms to 1 minute)
pub const MIN_RETRY_DELAY_MS: u64 = 100;
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Cache TTL bounds (1 second to 24 hours)
pub const MIN_CACHE_TTL_MS: u64 = 1_000;
pub const MAX_CACHE_TTL_MS: u64 = 86_400_000;

/// Cache size bounds
pub const MIN_CACHE_SIZE: usize = 1;
pub const MAX_CACHE_SIZE: usize = 10_000;
pub const DEFAULT_CACHE_SIZE: usize = 1_000;

/// Batch size bounds
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 1_000;
pub const WARN_BATCH_SIZE: usize = 500;

/// Batch concurrency bounds
pub const MIN_BATCH_CONCURRENCY: usize = 1;
pub const MAX_BATCH_CONCURRENCY: usize = 50;
pub const WARN_BATCH_CONCURRENCY: usize = 20;

/// Delay between batches (0 to 10 seconds)
pub const MAX_BATCH_DELAY_MS: u64 = 10_000;

/// Memory threshold for bulk results, in megabytes
pub const MIN_MEMORY_THRESHOLD_MB: u64 = 1;
pub const MAX_MEMORY_THRESHOLD_MB: u64 = 4_096;

/// API key minimum length per environment
pub const MIN_API_KEY_LENGTH_PRODUCTION: usize = 32;
pub const MIN_API_KEY_LENGTH_DEVELOPMENT: usize = 8;

/// Ports considered standard for the health check SSRF policy
pub const STANDARD_PORTS: &[u16] = &[80, 443];
