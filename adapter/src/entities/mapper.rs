use crate::config::MappingConfig;
use crate::model::{ModelType, Record, Where};
use serde_json::Value;
use std::collections::HashMap;

/// Outcome of field-level validation for one candidate record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Translates records between framework field names and API field names.
#[derive(Debug, Clone, Default)]
pub struct EntityMapper {
    api_paths: HashMap<String, String>,
    outbound_fields: HashMap<String, HashMap<String, String>>,
    inbound_fields: HashMap<String, HashMap<String, String>>,
}

impl EntityMapper {
    pub fn new(config: &MappingConfig) -> Self {
        let inbound_fields = config
            .field_mappings
            .iter()
            .map(|(model, fields)| {
                let reversed = fields
                    .iter()
                    .map(|(internal, api)| (api.clone(), internal.clone()))
                    .collect();
                (model.clone(), reversed)
            })
            .collect();

        Self {
            api_paths: config.api_paths.clone(),
            outbound_fields: config.field_mappings.clone(),
            inbound_fields,
        }
    }

    /// API path segment for a model, honoring configured overrides.
    pub fn api_path(&self, model: &ModelType) -> String {
        if let Some(path) = self.api_paths.get(model.as_str()) {
            return path.trim_matches('/').to_string();
        }

        match model {
            ModelType::User => "users".to_string(),
            ModelType::Session => "sessions".to_string(),
            ModelType::VerificationToken => "verification-tokens".to_string(),
            ModelType::Account => "accounts".to_string(),
            ModelType::Custom(name) => name.trim_matches('/').to_string(),
        }
    }

    pub fn transform_outbound(&self, model: &ModelType, data: &Record) -> Value {
        Value::Object(rename_keys(data, self.outbound_fields.get(model.as_str())))
    }

    /// Maps an API payload back to framework field names; `_id` becomes `id`.
    pub fn transform_inbound(&self, model: &ModelType, payload: &Record) -> Record {
        let mut record = rename_keys(payload, self.inbound_fields.get(model.as_str()));
        if !record.contains_key("id") {
            if let Some(id) = record.remove("_id") {
                record.insert("id".to_string(), id);
            }
        }
        record
    }

    /// Renames filter fields to their API names.
    pub fn transform_filter(&self, model: &ModelType, filter: &Where) -> Where {
        rename_keys(filter, self.outbound_fields.get(model.as_str()))
    }

    /// Checks the fields each model requires before insertion.
    pub fn validate(&self, model: &ModelType, data: &Record) -> ValidationOutcome {
        let mut errors = Vec::new();
        let required: &[&str] = match model {
            ModelType::User => &["email"],
            ModelType::Session => &["sessionToken", "userId", "expires"],
            ModelType::VerificationToken => &["identifier", "token", "expires"],
            ModelType::Account => &["userId", "provider", "providerAccountId"],
            ModelType::Custom(_) => &[],
        };

        for field in required {
            match data.get(*field) {
                None | Some(Value::Null) => errors.push(format!("{field} is required")),
                Some(Value::String(s)) if s.trim().is_empty() => {
                    errors.push(format!("{field} must not be empty"))
                }
                _ => {}
            }
        }

        if *model == ModelType::User {
            if let Some(email) = data.get("email").and_then(Value::as_str) {
                if !is_plausible_email(email) {
                    errors.push(format!("email '{email}' is not a valid address"));
                }
            }
        }

        if model.is_custom() && data.is_empty() {
            errors.push("record must contain at least one field".to_string());
        }

        ValidationOutcome::from_errors(errors)
    }
}

fn rename_keys(data: &Record, mapping: Option<&HashMap<String, String>>) -> Record {
    match mapping {
        None => data.clone(),
        Some(mapping) => data
            .iter()
            .map(|(key, value)| {
                let renamed = mapping.get(key).cloned().unwrap_or_else(|| key.clone());
                (renamed, value.clone())
            })
            .collect(),
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}
