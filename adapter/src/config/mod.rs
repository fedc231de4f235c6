//! # Adapter Configuration
//!
//! Configuration enters the adapter as a [`PartialAdapterConfig`], usually
//! deserialized from JSON with camelCase keys, and leaves the
//! [`ConfigValidator`] as a fully populated [`AdapterConfig`]. Nothing else
//! in the crate reads unvalidated configuration.
//!
//! ```no_run
//! use dataapi::config::{ConfigValidator, PartialAdapterConfig, ValidationOptions};
//!
//! let partial: PartialAdapterConfig = serde_json::from_str(
//!     r#"{"baseUrl": "https://api.example.com/", "apiKey": "k9f2Jq8LmZx41vB7nR0sT5wY3uH6pC1d"}"#,
//! ).unwrap();
//!
//! let result = ConfigValidator::new(ValidationOptions::from_env()).validate_config(&partial);
//! assert!(result.valid);
//! ```

pub mod health;
pub mod limits;
pub mod security;
pub mod validator;

pub use health::{HealthCheckOptions, HealthCheckResult, validate_health_check};
pub use validator::{
    ConfigError, ConfigValidationError, ConfigValidationResult, ConfigValidationWarning,
    ConfigValidator, ValidationErrorKind, ValidationOptions,
};

use crate::common::{RateLimiterConfig, RetryConfig};
use crate::http::{HttpTransport, SharedTransport};
use crate::utils::{EnvUtils, EnvVarError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Deployment environment; drives how strict security checks are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Environment variables consulted, in order, to detect the environment.
pub const ENVIRONMENT_VARS: &[&str] = &["DATAAPI_ENV", "APP_ENV", "RUST_ENV"];

impl Environment {
    /// Detects the environment from [`ENVIRONMENT_VARS`]; anything other
    /// than `production`/`prod` counts as development.
    pub fn from_env() -> Self {
        ENVIRONMENT_VARS
            .iter()
            .find_map(|name| EnvUtils::get_optional_var(name))
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

/// Retry section of the raw configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub retryable_statuses: Option<Vec<u16>>,
}

/// Response cache section of the raw configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    #[serde(default)]
    pub enabled: bool,
    pub ttl_ms: Option<u64>,
    pub max_size: Option<usize>,
}

/// Batch section of the raw configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSettings {
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub delay_ms: Option<u64>,
}

/// Bulk operation policy section of the raw configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSettings {
    pub skip_failures: Option<bool>,
    pub enable_progress: Option<bool>,
    pub memory_threshold_mb: Option<u64>,
}

/// API path overrides and per-model field renames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    /// Model name -> API path (`{"user": "accounts/users"}`)
    #[serde(default)]
    pub api_paths: HashMap<String, String>,
    /// Model name -> framework field -> API field
    #[serde(default)]
    pub field_mappings: HashMap<String, HashMap<String, String>>,
}

/// Caller-supplied transport replacing the built-in reqwest client.
#[derive(Clone)]
pub struct TransportOverride(pub SharedTransport);

impl TransportOverride {
    pub fn new(transport: impl HttpTransport + 'static) -> Self {
        Self(Arc::new(transport))
    }
}

impl std::fmt::Debug for TransportOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransportOverride(..)")
    }
}

/// Raw adapter configuration as supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAdapterConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Header carrying the API key; `Authorization: Bearer` when absent
    pub auth_header: Option<String>,
    /// Sent as `X-Tenant-ID` when present
    pub tenant_id: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retry_config: Option<RetrySettings>,
    pub cache_config: Option<CacheSettings>,
    pub batch_config: Option<BatchSettings>,
    pub bulk_config: Option<BulkSettings>,
    pub rate_limit: Option<RateLimiterConfig>,
    pub mapping: Option<MappingConfig>,
    #[serde(skip)]
    pub transport: Option<TransportOverride>,
}

impl PartialAdapterConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportOverride) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Reads the connection settings from `DATAAPI_BASE_URL`,
    /// `DATAAPI_API_KEY`, `DATAAPI_AUTH_HEADER`, `DATAAPI_TENANT_ID` and
    /// `DATAAPI_TIMEOUT_MS`. Sections not covered by variables stay unset.
    ///
    /// # Errors
    ///
    /// Returns [`EnvVarError`] when `DATAAPI_TIMEOUT_MS` is not a number.
    pub fn from_env() -> Result<Self, EnvVarError> {
        Ok(Self {
            base_url: EnvUtils::get_optional_var("DATAAPI_BASE_URL"),
            api_key: EnvUtils::get_optional_var("DATAAPI_API_KEY"),
            auth_header: EnvUtils::get_optional_var("DATAAPI_AUTH_HEADER"),
            tenant_id: EnvUtils::get_optional_var("DATAAPI_TENANT_ID"),
            timeout_ms: EnvUtils::get_parsed_var("DATAAPI_TIMEOUT_MS")?,
            ..Self::default()
        })
    }
}

/// Normalized cache settings; only present when caching is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_size: usize,
}

/// Adapter-level defaults applied to bulk calls that do not override them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkDefaults {
    pub batch_size: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub delay_between_batches: Option<Duration>,
    pub skip_failures: Option<bool>,
    pub enable_progress: Option<bool>,
    pub memory_threshold_bytes: Option<u64>,
}

/// Validated configuration every component is built from.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub auth_header: Option<String>,
    pub tenant_id: Option<String>,
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub cache: Option<CacheConfig>,
    pub bulk_defaults: BulkDefaults,
    pub rate_limit: Option<RateLimiterConfig>,
    pub mapping: MappingConfig,
    pub transport: Option<TransportOverride>,
    pub environment: Environment,
}
