use crate::adapter::DataApiAdapter;
use crate::config::{
    ConfigError, ConfigValidationResult, ConfigValidator, PartialAdapterConfig, ValidationOptions,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Named adapters plus memoized validation results.
///
/// Owned by the caller and passed around explicitly; separate registries
/// never share state.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<DataApiAdapter>>,
    validations: HashMap<String, ConfigValidationResult>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `partial` and registers the resulting adapter under `name`,
    /// replacing any adapter previously registered there.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn create_adapter(
        &mut self,
        name: impl Into<String>,
        partial: &PartialAdapterConfig,
        options: ValidationOptions,
    ) -> Result<Arc<DataApiAdapter>, ConfigError> {
        let name = name.into();
        let validator = ConfigValidator::new(options);
        let result = self.validate(&validator, partial);

        let mut config = match result.normalized_config {
            Some(config) if result.valid => config,
            _ => {
                return Err(ConfigError::Invalid {
                    errors: result.errors,
                });
            }
        };
        for warning in &result.warnings {
            log::warn!("Configuration warning [{}]: {}", warning.field, warning.message);
        }
        // Cached results may carry another caller's transport
        config.transport = partial.transport.clone();

        let adapter = Arc::new(DataApiAdapter::from_config(config));
        if self.adapters.insert(name.clone(), adapter.clone()).is_some() {
            log::info!("Replaced adapter '{name}'");
        } else {
            log::info!("Registered adapter '{name}'");
        }
        Ok(adapter)
    }

    /// Validates `partial`, reusing the result of an identical earlier call.
    pub fn validate(
        &mut self,
        validator: &ConfigValidator,
        partial: &PartialAdapterConfig,
    ) -> ConfigValidationResult {
        let key = match cache_key(validator, partial) {
            Some(key) => key,
            None => return validator.validate_config(partial),
        };

        if let Some(cached) = self.validations.get(&key) {
            log::debug!("Reusing cached configuration validation");
            return cached.clone();
        }

        let result = validator.validate_config(partial);
        self.validations.insert(key, result.clone());
        result
    }

    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<DataApiAdapter>) -> Option<Arc<DataApiAdapter>> {
        self.adapters.insert(name.into(), adapter)
    }

    pub fn get(&self, name: &str) -> Option<Arc<DataApiAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<DataApiAdapter>> {
        self.adapters.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn cached_validations(&self) -> usize {
        self.validations.len()
    }

    pub fn clear_validation_cache(&mut self) {
        self.validations.clear();
    }

    pub fn clear(&mut self) {
        self.adapters.clear();
        self.validations.clear();
    }
}

/// Serialized configuration plus every option that changes the verdict.
/// `serde_json::Value` maps are sorted, so equal configs give equal keys.
fn cache_key(validator: &ConfigValidator, partial: &PartialAdapterConfig) -> Option<String> {
    let options = validator.options();
    let config = serde_json::to_value(partial).ok()?;
    Some(format!(
        "{:?}|{}|{}|{}|{config}",
        options.environment,
        options.allow_private_networks,
        options.allow_non_standard_ports,
        partial.transport.is_some(),
    ))
}
