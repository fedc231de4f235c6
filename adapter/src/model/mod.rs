use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A single persisted entity as exchanged with the framework.
///
/// The data API decides the exact shape; typed access goes through the
/// helpers below.
pub type Record = Map<String, Value>;

/// Equality filter applied when looking records up (`{"userId": "u1"}`).
pub type Where = Map<String, Value>;

/// Entity kinds the adapter knows how to route.
///
/// The four built-in models map to dedicated API paths and natural keys.
/// Anything else is carried as [`ModelType::Custom`] and handled through the
/// generic HTTP path.
///
/// # Examples
///
/// ```no_run
/// use dataapi::model::ModelType;
///
/// let model: ModelType = "verificationToken".parse().unwrap();
/// assert_eq!(model, ModelType::VerificationToken);
/// assert_eq!(model.natural_key(), Some("token"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ModelType {
    User,
    Session,
    VerificationToken,
    Account,
    Custom(String),
}

impl ModelType {
    pub fn as_str(&self) -> &str {
        match self {
            ModelType::User => "user",
            ModelType::Session => "session",
            ModelType::VerificationToken => "verificationToken",
            ModelType::Account => "account",
            ModelType::Custom(name) => name,
        }
    }

    /// Field that uniquely identifies a record besides its id.
    pub fn natural_key(&self) -> Option<&'static str> {
        match self {
            ModelType::User => Some("email"),
            ModelType::Session => Some("sessionToken"),
            ModelType::VerificationToken => Some("token"),
            ModelType::Account | ModelType::Custom(_) => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ModelType::Custom(_))
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "user" | "users" => ModelType::User,
            "session" | "sessions" => ModelType::Session,
            "verificationToken" | "verification_token" | "verification-token"
            | "verificationTokens" => ModelType::VerificationToken,
            "account" | "accounts" => ModelType::Account,
            other => ModelType::Custom(other.to_string()),
        })
    }
}

impl From<String> for ModelType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

impl From<ModelType> for String {
    fn from(value: ModelType) -> Self {
        value.as_str().to_string()
    }
}

/// Reads the record identifier, accepting `id` or a Mongo-style `_id`.
pub fn record_id(record: &Record) -> Option<String> {
    ["id", "_id"]
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(value_as_key)
}

/// Reads a string-like field, rendering numbers as strings.
pub fn record_field(record: &Record, field: &str) -> Option<String> {
    record.get(field).and_then(value_as_key)
}

fn value_as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether `record` satisfies every equality constraint in `filter`.
pub fn matches_where(record: &Record, filter: &Where) -> bool {
    filter
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

/// Shallow merge of `patch` onto `base`; keys in `patch` win.
pub fn merge_records(base: &Record, patch: &Record) -> Record {
    let mut merged = base.clone();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Builds a one-field filter.
pub fn where_eq(field: &str, value: impl Into<Value>) -> Where {
    let mut filter = Where::new();
    filter.insert(field.to_string(), value.into());
    filter
}
