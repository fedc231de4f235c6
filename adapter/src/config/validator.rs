use super::limits::*;
use super::security::{is_private_host, looks_like_placeholder_key};
use super::{
    AdapterConfig, BulkDefaults, CacheConfig, Environment, PartialAdapterConfig,
    health::{HealthCheckOptions, HealthCheckResult, validate_health_check},
};
use crate::common::RetryConfig;
use crate::common::retry::DEFAULT_RETRYABLE_STATUSES;
use serde::Serialize;
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// Category of a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Required,
    InvalidFormat,
    OutOfRange,
    SecurityRisk,
    Conflict,
}

/// A field-level configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct ConfigValidationError {
    /// camelCase field path, e.g. `retryConfig.maxDelayMs`
    pub field: String,
    pub message: String,
    pub kind: ValidationErrorKind,
}

/// A field-level observation that does not block construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Outcome of one validation pass.
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    pub valid: bool,
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationWarning>,
    /// Present if and only if `valid`
    pub normalized_config: Option<AdapterConfig>,
}

impl ConfigValidationResult {
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn has_warning(&self, field: &str) -> bool {
        self.warnings.iter().any(|w| w.field == field)
    }

    pub fn error_for(&self, field: &str) -> Option<&ConfigValidationError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

/// Errors raised at adapter construction time.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid adapter configuration ({} problems): {}", .errors.len(), summarize(.errors))]
    Invalid { errors: Vec<ConfigValidationError> },

    #[error("Health check failed for {url}: {reason}")]
    HealthCheckFailed { url: String, reason: String },
}

fn summarize(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Knobs controlling how strict validation is.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    pub environment: Environment,
    /// Accept loopback/private base URLs without an SSRF warning
    pub allow_private_networks: bool,
    /// Accept ports other than 80/443 during health checks
    pub allow_non_standard_ports: bool,
}

impl ValidationOptions {
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            ..Self::default()
        }
    }

    pub fn development() -> Self {
        Self::default()
    }

    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.allow_private_networks = allow;
        self
    }

    pub fn allow_non_standard_ports(mut self, allow: bool) -> Self {
        self.allow_non_standard_ports = allow;
        self
    }
}

/// Accumulates errors and warnings during one pass.
#[derive(Default)]
struct Report {
    errors: Vec<ConfigValidationError>,
    warnings: Vec<ConfigValidationWarning>,
}

impl Report {
    fn error(&mut self, field: &str, kind: ValidationErrorKind, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.to_string(),
            message: message.into(),
            kind,
        });
    }

    fn warn(&mut self, field: &str, message: impl Into<String>, suggestion: Option<&str>) {
        self.warnings.push(ConfigValidationWarning {
            field: field.to_string(),
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
        });
    }

    fn range<T>(&mut self, field: &str, value: T, min: T, max: T) -> bool
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min || value > max {
            self.error(
                field,
                ValidationErrorKind::OutOfRange,
                format!("{value} is out of range ({min} - {max})"),
            );
            false
        } else {
            true
        }
    }
}

/// Validates and normalizes adapter configuration, applying security policy
/// according to the configured environment.
///
/// # Examples
///
/// ```no_run
/// use dataapi::config::{ConfigValidator, PartialAdapterConfig, ValidationOptions};
///
/// let validator = ConfigValidator::new(ValidationOptions::production());
/// let result = validator.validate_config(&PartialAdapterConfig::new("http://api.example.com"));
/// assert!(!result.valid);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigValidator {
    options: ValidationOptions,
}

impl ConfigValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Runs every check and returns the full report. Never fails.
    pub fn validate_config(&self, config: &PartialAdapterConfig) -> ConfigValidationResult {
        let mut report = Report::default();

        let base_url = self.check_base_url(config.base_url.as_deref(), &mut report);
        self.check_api_key(config, &mut report);
        self.check_timeout(config, &mut report);
        self.check_retry(config, &mut report);
        self.check_cache(config, &mut report);
        self.check_batch(config, &mut report);
        self.check_bulk(config, &mut report);

        if let Some(rate_limit) = &config.rate_limit {
            if rate_limit.requests_per_second == 0 {
                report.error(
                    "rateLimit.requestsPerSecond",
                    ValidationErrorKind::OutOfRange,
                    "must be at least 1",
                );
            }
        }

        if config.api_key.is_some() && config.transport.is_some() {
            report.warn(
                "transport",
                "Both an API key and a custom transport are configured; requests may be authenticated twice",
                Some("Let the custom transport own authentication or drop apiKey"),
            );
        }

        let valid = report.errors.is_empty();
        let normalized_config = match (valid, base_url) {
            (true, Some(base_url)) => Some(self.normalize(config, base_url)),
            _ => None,
        };

        ConfigValidationResult {
            valid: valid && normalized_config.is_some(),
            errors: report.errors,
            warnings: report.warnings,
            normalized_config,
        }
    }

    /// Construction-time entry point: every problem is reported at once, and
    /// warnings are logged when the configuration is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every field-level error.
    pub fn validate_and_throw(
        &self,
        config: &PartialAdapterConfig,
    ) -> Result<AdapterConfig, ConfigError> {
        let result = self.validate_config(config);

        match result.normalized_config {
            Some(normalized) if result.valid => {
                for warning in &result.warnings {
                    log::warn!("Configuration warning [{}]: {}", warning.field, warning.message);
                }
                Ok(normalized)
            }
            _ => {
                log::error!(
                    "Adapter configuration rejected with {} errors",
                    result.errors.len()
                );
                Err(ConfigError::Invalid {
                    errors: result.errors,
                })
            }
        }
    }

    /// Probes `base_url` once under this validator's SSRF policy.
    pub async fn validate_health_check(&self, base_url: &str) -> HealthCheckResult {
        let options = HealthCheckOptions {
            environment: self.options.environment,
            allow_private_networks: self.options.allow_private_networks,
            allow_non_standard_ports: self.options.allow_non_standard_ports,
            ..HealthCheckOptions::default()
        };
        validate_health_check(base_url, &options).await
    }

    fn is_production(&self) -> bool {
        self.options.environment.is_production()
    }

    /// Returns the normalized base URL when it passes format checks.
    fn check_base_url(&self, base_url: Option<&str>, report: &mut Report) -> Option<String> {
        const FIELD: &str = "baseUrl";

        let raw = match base_url.map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => {
                report.error(FIELD, ValidationErrorKind::Required, "baseUrl is required");
                return None;
            }
        };

        if !(raw.starts_with("http://") || raw.starts_with("https://")) {
            report.error(
                FIELD,
                ValidationErrorKind::InvalidFormat,
                "baseUrl must start with http:// or https://",
            );
            return None;
        }

        let parsed = match reqwest::Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                report.error(
                    FIELD,
                    ValidationErrorKind::InvalidFormat,
                    format!("baseUrl is not a valid URL: {e}"),
                );
                return None;
            }
        };

        if parsed.port() == Some(0) {
            report.error(FIELD, ValidationErrorKind::InvalidFormat, "port 0 is not valid");
            return None;
        }

        let Some(host) = parsed.host_str() else {
            report.error(FIELD, ValidationErrorKind::InvalidFormat, "baseUrl has no host");
            return None;
        };

        let private = is_private_host(host);
        if parsed.scheme() == "http" && !private {
            if self.is_production() {
                report.error(
                    FIELD,
                    ValidationErrorKind::SecurityRisk,
                    "Plain HTTP to a public host is not allowed in production",
                );
            } else {
                report.warn(
                    FIELD,
                    "Plain HTTP exposes credentials in transit",
                    Some("Use https:// outside local development"),
                );
            }
        }

        if private && self.is_production() && !self.options.allow_private_networks {
            report.warn(
                FIELD,
                format!("{host} is a private or loopback address (possible SSRF target)"),
                Some("Point production at a public API host"),
            );
        }

        let mut normalized = raw.to_string();
        if normalized.ends_with('/') {
            normalized = normalized.trim_end_matches('/').to_string();
            report.warn(FIELD, "Trailing slash removed from baseUrl", None);
        }

        Some(normalized)
    }

    fn check_api_key(&self, config: &PartialAdapterConfig, report: &mut Report) {
        const FIELD: &str = "apiKey";

        let Some(key) = config.api_key.as_deref() else {
            if self.is_production() && config.transport.is_none() {
                report.warn(FIELD, "No API key configured", None);
            }
            return;
        };

        let key = key.trim();
        if key.is_empty() {
            report.error(FIELD, ValidationErrorKind::InvalidFormat, "apiKey must not be empty");
            return;
        }

        if self.is_production() {
            if key.len() < MIN_API_KEY_LENGTH_PRODUCTION {
                report.error(
                    FIELD,
                    ValidationErrorKind::SecurityRisk,
                    format!(
                        "apiKey must be at least {MIN_API_KEY_LENGTH_PRODUCTION} characters in production"
                    ),
                );
            }
            if looks_like_placeholder_key(key) {
                report.error(
                    FIELD,
                    ValidationErrorKind::SecurityRisk,
                    "apiKey looks like a placeholder or test credential",
                );
            }
        } else {
            if key.len() < MIN_API_KEY_LENGTH_DEVELOPMENT {
                report.warn(
                    FIELD,
                    format!("apiKey is shorter than {MIN_API_KEY_LENGTH_DEVELOPMENT} characters"),
                    None,
                );
            }
            if looks_like_placeholder_key(key) {
                report.warn(
                    FIELD,
                    "apiKey looks like a placeholder or test credential",
                    Some("Replace it before deploying to production"),
                );
            }
        }
    }

    fn check_timeout(&self, config: &PartialAdapterConfig, report: &mut Report) {
        if let Some(timeout) = config.timeout_ms {
            if report.range("timeoutMs", timeout, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)
                && timeout > WARN_TIMEOUT_MS
            {
                report.warn(
                    "timeoutMs",
                    format!("Timeout of {timeout}ms is unusually high"),
                    None,
                );
            }
        }
    }

    fn check_retry(&self, config: &PartialAdapterConfig, report: &mut Report) {
        let Some(retry) = &config.retry_config else {
            return;
        };

        if let Some(max_retries) = retry.max_retries {
            if report.range("retryConfig.maxRetries", max_retries, 0, MAX_RETRIES)
                && max_retries > WARN_RETRIES
            {
                report.warn(
                    "retryConfig.maxRetries",
                    format!("{max_retries} retries may amplify load during outages"),
                    None,
                );
            }
        }

        let initial_ok = retry.initial_delay_ms.is_none_or(|initial| {
            report.range(
                "retryConfig.initialDelayMs",
                initial,
                MIN_RETRY_DELAY_MS,
                MAX_RETRY_DELAY_MS,
            )
        });
        let max_ok = retry.max_delay_ms.is_none_or(|max| {
            report.range(
                "retryConfig.maxDelayMs",
                max,
                MIN_RETRY_DELAY_MS,
                MAX_RETRY_DELAY_MS,
            )
        });

        if initial_ok && max_ok {
            let defaults = RetryConfig::default();
            let initial = retry
                .initial_delay_ms
                .unwrap_or(defaults.initial_delay.as_millis() as u64);
            let max = retry
                .max_delay_ms
                .unwrap_or(defaults.max_delay.as_millis() as u64);
            if max < initial {
                report.error(
                    "retryConfig.maxDelayMs",
                    ValidationErrorKind::Conflict,
                    format!("maxDelayMs ({max}) must be >= initialDelayMs ({initial})"),
                );
            }
        }

        if let Some(statuses) = &retry.retryable_statuses {
            if let Some(bad) = statuses.iter().find(|s| !(100..=599).contains(*s)) {
                report.error(
                    "retryConfig.retryableStatuses",
                    ValidationErrorKind::InvalidFormat,
                    format!("{bad} is not an HTTP status code"),
                );
            }
        }
    }

    fn check_cache(&self, config: &PartialAdapterConfig, report: &mut Report) {
        let Some(cache) = &config.cache_config else {
            return;
        };

        if cache.enabled && cache.ttl_ms.is_none() {
            report.error(
                "cacheConfig",
                ValidationErrorKind::Required,
                "ttlMs is required when the cache is enabled",
            );
        }
        if let Some(ttl) = cache.ttl_ms {
            report.range("cacheConfig.ttlMs", ttl, MIN_CACHE_TTL_MS, MAX_CACHE_TTL_MS);
        }
        if let Some(size) = cache.max_size {
            report.range("cacheConfig.maxSize", size, MIN_CACHE_SIZE, MAX_CACHE_SIZE);
        }
    }

    fn check_batch(&self, config: &PartialAdapterConfig, report: &mut Report) {
        let Some(batch) = &config.batch_config else {
            return;
        };

        if let Some(size) = batch.batch_size {
            if report.range("batchConfig.batchSize", size, MIN_BATCH_SIZE, MAX_BATCH_SIZE)
                && size > WARN_BATCH_SIZE
            {
                report.warn(
                    "batchConfig.batchSize",
                    format!("Batch size {size} may exceed API payload limits"),
                    None,
                );
            }
        }
        if let Some(concurrency) = batch.concurrency {
            if report.range(
                "batchConfig.concurrency",
                concurrency,
                MIN_BATCH_CONCURRENCY,
                MAX_BATCH_CONCURRENCY,
            ) && concurrency > WARN_BATCH_CONCURRENCY
            {
                report.warn(
                    "batchConfig.concurrency",
                    format!("Concurrency {concurrency} may trigger API rate limits"),
                    None,
                );
            }
        }
        if let Some(delay) = batch.delay_ms {
            report.range("batchConfig.delayMs", delay, 0, MAX_BATCH_DELAY_MS);
        }
    }

    fn check_bulk(&self, config: &PartialAdapterConfig, report: &mut Report) {
        if let Some(threshold) = config
            .bulk_config
            .as_ref()
            .and_then(|bulk| bulk.memory_threshold_mb)
        {
            report.range(
                "bulkConfig.memoryThresholdMb",
                threshold,
                MIN_MEMORY_THRESHOLD_MB,
                MAX_MEMORY_THRESHOLD_MB,
            );
        }
    }

    fn normalize(&self, config: &PartialAdapterConfig, base_url: String) -> AdapterConfig {
        let retry_settings = config.retry_config.clone().unwrap_or_default();
        let defaults = RetryConfig::default();
        let initial_delay = retry_settings
            .initial_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_delay);
        let max_delay = retry_settings
            .max_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay);
        let retry = RetryConfig::new(
            retry_settings.max_retries.unwrap_or(defaults.max_retries),
            initial_delay,
            max_delay,
        )
        .with_retryable_statuses(
            retry_settings
                .retryable_statuses
                .unwrap_or_else(|| DEFAULT_RETRYABLE_STATUSES.to_vec()),
        );

        let cache = config
            .cache_config
            .as_ref()
            .filter(|cache| cache.enabled)
            .and_then(|cache| {
                cache.ttl_ms.map(|ttl| CacheConfig {
                    ttl: Duration::from_millis(ttl),
                    max_size: cache.max_size.unwrap_or(DEFAULT_CACHE_SIZE),
                })
            });

        let batch = config.batch_config.clone().unwrap_or_default();
        let bulk = config.bulk_config.clone().unwrap_or_default();
        let bulk_defaults = BulkDefaults {
            batch_size: batch.batch_size,
            max_concurrency: batch.concurrency,
            delay_between_batches: batch.delay_ms.map(Duration::from_millis),
            skip_failures: bulk.skip_failures,
            enable_progress: bulk.enable_progress,
            memory_threshold_bytes: bulk.memory_threshold_mb.map(|mb| mb * 1024 * 1024),
        };

        AdapterConfig {
            base_url,
            api_key: config.api_key.as_deref().map(str::trim).map(str::to_string),
            auth_header: config.auth_header.clone(),
            tenant_id: config.tenant_id.clone(),
            timeout: Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            retry,
            cache,
            bulk_defaults,
            rate_limit: config.rate_limit.clone(),
            mapping: config.mapping.clone().unwrap_or_default(),
            transport: config.transport.clone(),
            environment: self.options.environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BatchSettings, CacheSettings, RetrySettings};

    const STRONG_KEY: &str = "k9f2Jq8LmZx41vB7nR0sT5wY3uH6pC1d";

    fn dev() -> ConfigValidator {
        ConfigValidator::new(ValidationOptions::development())
    }

    fn prod() -> ConfigValidator {
        ConfigValidator::new(ValidationOptions::production())
    }

    #[test]
    fn test_missing_base_url() {
        let result = dev().validate_config(&PartialAdapterConfig::default());
        assert!(!result.valid);
        assert_eq!(
            result.error_for("baseUrl").unwrap().kind,
            ValidationErrorKind::Required
        );
        assert!(result.normalized_config.is_none());
    }

    #[test]
    fn test_invalid_scheme_and_port() {
        let result = dev().validate_config(&PartialAdapterConfig::new("ftp://api.example.com"));
        assert!(result.has_error("baseUrl"));

        let result = dev().validate_config(&PartialAdapterConfig::new("https://api.example.com:99999"));
        assert!(result.has_error("baseUrl"));

        let result = dev().validate_config(&PartialAdapterConfig::new("https://api.example.com:0"));
        assert!(result.has_error("baseUrl"));
    }

    #[test]
    fn test_trailing_slash_is_normalized_with_warning() {
        let result = dev().validate_config(&PartialAdapterConfig::new("https://api.example.com/v1/"));
        assert!(result.valid);
        assert!(result.has_warning("baseUrl"));
        assert_eq!(
            result.normalized_config.unwrap().base_url,
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn test_plain_http_is_error_in_production_only() {
        let config = PartialAdapterConfig::new("http://api.example.com").with_api_key(STRONG_KEY);

        let result = prod().validate_config(&config);
        assert!(!result.valid);
        assert_eq!(
            result.error_for("baseUrl").unwrap().kind,
            ValidationErrorKind::SecurityRisk
        );

        let result = dev().validate_config(&config);
        assert!(result.valid);
        assert!(result.has_warning("baseUrl"));
    }

    #[test]
    fn test_private_base_url_warns_in_production() {
        let config = PartialAdapterConfig::new("http://localhost:8080").with_api_key(STRONG_KEY);

        let result = prod().validate_config(&config);
        assert!(result.valid);
        assert!(result.has_warning("baseUrl"));

        let result = dev().validate_config(&config);
        assert!(result.valid);
        assert!(!result.has_warning("baseUrl"));

        let validator = ConfigValidator::new(
            ValidationOptions::production().allow_private_networks(true),
        );
        assert!(!validator.validate_config(&config).has_warning("baseUrl"));
    }

    #[test]
    fn test_api_key_strength() {
        let short = PartialAdapterConfig::new("https://api.example.com").with_api_key("abc");
        assert!(prod().validate_config(&short).has_error("apiKey"));
        let result = dev().validate_config(&short);
        assert!(result.valid);
        assert!(result.has_warning("apiKey"));

        let placeholder = PartialAdapterConfig::new("https://api.example.com")
            .with_api_key("test-key-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let result = prod().validate_config(&placeholder);
        assert_eq!(
            result.error_for("apiKey").unwrap().kind,
            ValidationErrorKind::SecurityRisk
        );
        assert!(dev().validate_config(&placeholder).valid);

        let strong = PartialAdapterConfig::new("https://api.example.com").with_api_key(STRONG_KEY);
        assert!(prod().validate_config(&strong).valid);
    }

    #[test]
    fn test_numeric_ranges() {
        let mut config = PartialAdapterConfig::new("https://api.example.com");
        config.timeout_ms = Some(500);
        config.retry_config = Some(RetrySettings {
            max_retries: Some(11),
            initial_delay_ms: Some(50),
            ..RetrySettings::default()
        });
        config.batch_config = Some(BatchSettings {
            batch_size: Some(0),
            concurrency: Some(51),
            delay_ms: Some(10_001),
        });
        config.cache_config = Some(CacheSettings {
            enabled: true,
            ttl_ms: Some(500),
            max_size: Some(10_001),
        });

        let result = dev().validate_config(&config);
        assert!(!result.valid);
        for field in [
            "timeoutMs",
            "retryConfig.maxRetries",
            "retryConfig.initialDelayMs",
            "batchConfig.batchSize",
            "batchConfig.concurrency",
            "batchConfig.delayMs",
            "cacheConfig.ttlMs",
            "cacheConfig.maxSize",
        ] {
            assert!(result.has_error(field), "expected error on {field}");
        }
    }

    #[test]
    fn test_near_limit_values_warn() {
        let mut config = PartialAdapterConfig::new("https://api.example.com");
        config.timeout_ms = Some(120_000);
        config.retry_config = Some(RetrySettings {
            max_retries: Some(8),
            ..RetrySettings::default()
        });

        let result = dev().validate_config(&config);
        assert!(result.valid);
        assert!(result.has_warning("timeoutMs"));
        assert!(result.has_warning("retryConfig.maxRetries"));
    }

    #[test]
    fn test_max_delay_must_not_be_below_initial() {
        let mut config = PartialAdapterConfig::new("https://api.example.com");
        config.retry_config = Some(RetrySettings {
            initial_delay_ms: Some(5_000),
            max_delay_ms: Some(1_000),
            ..RetrySettings::default()
        });

        let result = dev().validate_config(&config);
        assert_eq!(
            result.error_for("retryConfig.maxDelayMs").unwrap().kind,
            ValidationErrorKind::Conflict
        );
    }

    #[test]
    fn test_enabled_cache_requires_ttl() {
        let mut config = PartialAdapterConfig::new("https://api.example.com");
        config.cache_config = Some(CacheSettings {
            enabled: true,
            ..CacheSettings::default()
        });

        let result = dev().validate_config(&config);
        assert!(!result.valid);
        assert!(result.has_error("cacheConfig"));
    }

    #[test]
    fn test_api_key_with_custom_transport_warns() {
        use crate::config::TransportOverride;
        use crate::http::{HttpRequest, HttpResponse, HttpTransport};
        use async_trait::async_trait;

        struct Noop;

        #[async_trait]
        impl HttpTransport for Noop {
            async fn send(
                &self,
                _request: HttpRequest,
            ) -> crate::common::DataApiResult<HttpResponse> {
                Ok(HttpResponse::ok(serde_json::Value::Null))
            }
        }

        let config = PartialAdapterConfig::new("https://api.example.com")
            .with_api_key(STRONG_KEY)
            .with_transport(TransportOverride::new(Noop));

        let result = dev().validate_config(&config);
        assert!(result.valid);
        assert!(result.has_warning("transport"));
    }

    #[test]
    fn test_normalized_defaults() {
        let mut config = PartialAdapterConfig::new("https://api.example.com");
        config.cache_config = Some(CacheSettings {
            enabled: true,
            ttl_ms: Some(60_000),
            max_size: None,
        });

        let normalized = dev().validate_and_throw(&config).unwrap();
        assert_eq!(normalized.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(normalized.retry, RetryConfig::default());
        assert_eq!(
            normalized.cache,
            Some(CacheConfig {
                ttl: Duration::from_secs(60),
                max_size: DEFAULT_CACHE_SIZE
            })
        );
    }

    #[test]
    fn test_validate_and_throw_aggregates_errors() {
        let mut config = PartialAdapterConfig::default();
        config.timeout_ms = Some(1);

        let error = dev().validate_and_throw(&config).unwrap_err();
        match &error {
            ConfigError::Invalid { errors } => {
                assert_eq!(errors.len(), 2);
                assert!(error.to_string().contains("baseUrl"));
                assert!(error.to_string().contains("timeoutMs"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
