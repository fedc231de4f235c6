use crate::bulk_operations::{
    BulkOperationResult, BulkOperations, CreateManyOptions, DeleteManyOptions, UpdateManyOptions,
};
use crate::common::{DataApiResult, RetryExecutor};
use crate::config::{
    AdapterConfig, ConfigError, ConfigValidator, HealthCheckOptions, HealthCheckResult,
    PartialAdapterConfig, ValidationOptions, validate_health_check,
};
use crate::entities::{EntityMapper, HttpEntityOperations, SharedEntityOperations};
use crate::http::{CachedTransport, ReqwestTransport, ResponseCache, RetryingTransport, SharedTransport};
use crate::model::ModelType;
use std::sync::Arc;

/// Entry point wiring a validated configuration into transports, entity
/// operations and the bulk engine.
///
/// Requests flow through the configured transport (or the built-in reqwest
/// client), a retry layer and, when enabled, a GET response cache.
///
/// # Examples
///
/// ```no_run
/// use dataapi::adapter::DataApiAdapter;
/// use dataapi::config::{PartialAdapterConfig, ValidationOptions};
///
/// let adapter = DataApiAdapter::new(
///     &PartialAdapterConfig::new("https://api.example.com")
///         .with_api_key("k9f2Jq8LmZx41vB7nR0sT5wY3uH6pC1d"),
///     ValidationOptions::from_env(),
/// )?;
///
/// assert_eq!(adapter.config().base_url, "https://api.example.com");
/// # Ok::<(), dataapi::config::ConfigError>(())
/// ```
pub struct DataApiAdapter {
    config: AdapterConfig,
    transport: SharedTransport,
    mapper: Arc<EntityMapper>,
    users: SharedEntityOperations,
    sessions: SharedEntityOperations,
    verification_tokens: SharedEntityOperations,
    accounts: SharedEntityOperations,
    bulk: BulkOperations,
}

impl DataApiAdapter {
    /// Validates `partial` and builds the adapter. Warnings are logged.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] listing every configuration problem.
    pub fn new(partial: &PartialAdapterConfig, options: ValidationOptions) -> Result<Self, ConfigError> {
        let config = ConfigValidator::new(options).validate_and_throw(partial)?;
        Ok(Self::from_config(config))
    }

    /// Builds the adapter from configuration that already passed validation.
    pub fn from_config(config: AdapterConfig) -> Self {
        let transport = build_transport(&config);
        let mapper = Arc::new(EntityMapper::new(&config.mapping));

        let operations_for = |model: ModelType| -> SharedEntityOperations {
            Arc::new(HttpEntityOperations::new(
                model,
                config.base_url.clone(),
                transport.clone(),
                mapper.clone(),
            ))
        };
        let users = operations_for(ModelType::User);
        let sessions = operations_for(ModelType::Session);
        let verification_tokens = operations_for(ModelType::VerificationToken);
        let accounts = operations_for(ModelType::Account);

        let bulk = BulkOperations::new(
            mapper.clone(),
            RetryExecutor::new(config.retry.clone()),
            config.bulk_defaults.clone(),
        )
        .with_user_operations(users.clone())
        .with_session_operations(sessions.clone())
        .with_verification_token_operations(verification_tokens.clone())
        .with_operations(accounts.clone())
        .with_http_fallback(config.base_url.clone(), transport.clone());

        log::info!(
            "Data API adapter ready for {} ({:?}, cache {})",
            config.base_url,
            config.environment,
            if config.cache.is_some() { "on" } else { "off" }
        );

        Self {
            config,
            transport,
            mapper,
            users,
            sessions,
            verification_tokens,
            accounts,
            bulk,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    pub fn mapper(&self) -> &EntityMapper {
        &self.mapper
    }

    pub fn users(&self) -> &SharedEntityOperations {
        &self.users
    }

    pub fn sessions(&self) -> &SharedEntityOperations {
        &self.sessions
    }

    pub fn verification_tokens(&self) -> &SharedEntityOperations {
        &self.verification_tokens
    }

    pub fn accounts(&self) -> &SharedEntityOperations {
        &self.accounts
    }

    /// Operations for any model; custom models use the generic REST route.
    pub fn operations(&self, model: &ModelType) -> SharedEntityOperations {
        match model {
            ModelType::User => self.users.clone(),
            ModelType::Session => self.sessions.clone(),
            ModelType::VerificationToken => self.verification_tokens.clone(),
            ModelType::Account => self.accounts.clone(),
            ModelType::Custom(_) => Arc::new(HttpEntityOperations::new(
                model.clone(),
                self.config.base_url.clone(),
                self.transport.clone(),
                self.mapper.clone(),
            )),
        }
    }

    pub fn bulk(&self) -> &BulkOperations {
        &self.bulk
    }

    pub async fn update_many(&self, options: UpdateManyOptions) -> DataApiResult<BulkOperationResult> {
        self.bulk.update_many(options).await
    }

    pub async fn delete_many(&self, options: DeleteManyOptions) -> DataApiResult<BulkOperationResult> {
        self.bulk.delete_many(options).await
    }

    pub async fn create_many(&self, options: CreateManyOptions) -> DataApiResult<BulkOperationResult> {
        self.bulk.create_many(options).await
    }

    pub fn cancel_operation(&self, operation_id: &str) -> bool {
        self.bulk.cancel_operation(operation_id)
    }

    /// Probes the configured base URL under `options`.
    pub async fn health_check(&self, options: &HealthCheckOptions) -> HealthCheckResult {
        validate_health_check(&self.config.base_url, options).await
    }
}

fn build_transport(config: &AdapterConfig) -> SharedTransport {
    let base: SharedTransport = match &config.transport {
        Some(custom) => {
            log::debug!("Using caller-supplied transport");
            custom.0.clone()
        }
        None => Arc::new(ReqwestTransport::from_config(config)),
    };

    let retrying: SharedTransport = Arc::new(RetryingTransport::new(
        base,
        RetryExecutor::new(config.retry.clone()),
    ));

    match &config.cache {
        Some(cache) => Arc::new(CachedTransport::new(
            retrying,
            ResponseCache::new(cache.ttl, cache.max_size),
        )),
        None => retrying,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheSettings, TransportOverride};
    use crate::http::{HttpRequest, HttpResponse, HttpTransport};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> DataApiResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::ok(json!({"data": [{"_id": "u1", "email": "a@example.com"}]})))
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = DataApiAdapter::new(
            &PartialAdapterConfig::default(),
            ValidationOptions::development(),
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_custom_transport_with_cache() {
        let counting = Arc::new(CountingTransport::default());
        let mut partial = PartialAdapterConfig::new("https://api.example.com")
            .with_transport(TransportOverride(counting.clone()));
        partial.cache_config = Some(CacheSettings {
            enabled: true,
            ttl_ms: Some(60_000),
            max_size: None,
        });

        let adapter = DataApiAdapter::new(&partial, ValidationOptions::development()).unwrap();
        let first = adapter.users().find_many(&Default::default()).await.unwrap();
        let second = adapter.users().find_many(&Default::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0]["id"], "u1");
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_model_operations() {
        let adapter = DataApiAdapter::new(
            &PartialAdapterConfig::new("https://api.example.com"),
            ValidationOptions::development(),
        )
        .unwrap();

        let operations = adapter.operations(&ModelType::Custom("invoices".to_string()));
        assert_eq!(operations.model(), ModelType::Custom("invoices".to_string()));
        assert_eq!(adapter.accounts().model(), ModelType::Account);
    }
}
