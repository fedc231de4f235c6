use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error taxonomy shared by every HTTP-calling component.
///
/// Callers branch on this closed set of kinds. The string form of each kind
/// (`VALIDATION_ERROR`, `RATE_LIMIT`, ...) is what ends up in logs and in
/// serialized bulk results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimit,
    #[serde(rename = "SERVER_ERROR")]
    Server,
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// Maps an HTTP status code onto the taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            408 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimit,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        }
    }

    /// Maps a low-level network error code (`ECONNRESET`, `ETIMEDOUT`, ...)
    /// onto the taxonomy. Unrecognized codes yield `None`.
    pub fn from_network_code(code: &str) -> Option<Self> {
        let upper = code.to_ascii_uppercase();
        if TIMEOUT_CODES.contains(&upper.as_str()) {
            Some(ErrorKind::Timeout)
        } else if NETWORK_CODES.contains(&upper.as_str()) {
            Some(ErrorKind::Network)
        } else {
            None
        }
    }

    /// Whether failures of this kind are worth retrying by default.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit | ErrorKind::Server | ErrorKind::Network | ErrorKind::Timeout
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::Server => "SERVER_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const NETWORK_CODES: &[&str] = &[
    "ECONNRESET",
    "ECONNREFUSED",
    "ENOTFOUND",
    "EAI_AGAIN",
    "EPIPE",
    "EHOSTUNREACH",
    "ENETUNREACH",
];

const TIMEOUT_CODES: &[&str] = &["ETIMEDOUT", "ESOCKETTIMEDOUT", "ECONNABORTED"];

/// Message fragments that identify transport-level failures regardless of
/// any status code attached to the error.
const NETWORK_MESSAGE_PATTERNS: &[&str] = &[
    "econnreset",
    "econnrefused",
    "enotfound",
    "connection reset",
    "connection refused",
    "connection closed",
    "dns error",
    "network error",
    "socket hang up",
];

const TIMEOUT_MESSAGE_PATTERNS: &[&str] = &[
    "etimedout",
    "esockettimedout",
    "timed out",
    "timeout exceeded",
    "request timeout",
    "deadline has elapsed",
];

/// Error raised by the adapter for any failed data API interaction.
///
/// Carries an explicit taxonomy kind, the HTTP status when one was observed,
/// and a `retryable` flag that is decided when the error is built. The
/// `permanent` marker lets a caller veto retries even for statuses that
/// would otherwise qualify.
///
/// # Examples
///
/// ```no_run
/// use dataapi::common::{DataApiError, ErrorKind};
///
/// let error = DataApiError::from_status(503, "upstream unavailable");
/// assert_eq!(error.kind, ErrorKind::Server);
/// assert!(error.retryable);
///
/// let error = DataApiError::validation("email is required").with_operation("createMany");
/// assert!(!error.retryable);
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}: {message}")]
pub struct DataApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub operation: Option<String>,
    pub retryable: bool,
    pub permanent: bool,
}

impl DataApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
            operation: None,
            retryable: kind.is_retryable(),
            permanent: false,
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let mut error = Self::new(ErrorKind::from_status(status), message);
        error.status = Some(status);
        error
    }

    /// Builds an error from a network error code such as `ECONNREFUSED`.
    pub fn from_network_code(code: &str, message: impl Into<String>) -> Self {
        let kind = ErrorKind::from_network_code(code).unwrap_or(ErrorKind::Unknown);
        let mut error = Self::new(kind, message);
        error.code = Some(code.to_string());
        error
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Marks the error as never retryable.
    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self.retryable = false;
        self
    }

    /// Prefixes the message with additional context, keeping kind and status.
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    /// Whether the message looks like a transport-level connection failure.
    pub fn is_network_message(&self) -> bool {
        let message = self.message.to_ascii_lowercase();
        NETWORK_MESSAGE_PATTERNS
            .iter()
            .any(|pattern| message.contains(pattern))
    }

    /// Whether the message looks like a timeout of any flavour.
    pub fn is_timeout_message(&self) -> bool {
        let message = self.message.to_ascii_lowercase();
        TIMEOUT_MESSAGE_PATTERNS
            .iter()
            .any(|pattern| message.contains(pattern))
    }
}

impl From<serde_json::Error> for DataApiError {
    fn from(err: serde_json::Error) -> Self {
        DataApiError::validation(format!("Invalid JSON payload: {err}")).permanent()
    }
}

pub type DataApiResult<T> = Result<T, DataApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ErrorKind::from_status(400), ErrorKind::Validation);
        assert_eq!(ErrorKind::from_status(401), ErrorKind::Unauthorized);
        assert_eq!(ErrorKind::from_status(403), ErrorKind::Forbidden);
        assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(409), ErrorKind::Conflict);
        assert_eq!(ErrorKind::from_status(429), ErrorKind::RateLimit);
        assert_eq!(ErrorKind::from_status(502), ErrorKind::Server);
        assert_eq!(ErrorKind::from_status(302), ErrorKind::Unknown);
    }

    #[test]
    fn test_retryable_defaults() {
        assert!(DataApiError::from_status(500, "boom").retryable);
        assert!(DataApiError::from_status(429, "slow down").retryable);
        assert!(!DataApiError::from_status(404, "missing").retryable);
        assert!(!DataApiError::from_status(500, "boom").permanent().retryable);
    }

    #[test]
    fn test_network_codes() {
        let error = DataApiError::from_network_code("ECONNREFUSED", "refused");
        assert_eq!(error.kind, ErrorKind::Network);
        assert!(error.retryable);

        let error = DataApiError::from_network_code("etimedout", "slow");
        assert_eq!(error.kind, ErrorKind::Timeout);

        let error = DataApiError::from_network_code("EWHATEVER", "odd");
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert!(!error.retryable);
    }

    #[test]
    fn test_message_patterns() {
        assert!(DataApiError::unknown("read ECONNRESET").is_network_message());
        assert!(DataApiError::unknown("request timed out").is_timeout_message());
        assert!(!DataApiError::unknown("bad input").is_network_message());
    }

    #[test]
    fn test_field_names_are_not_timeouts() {
        let error = DataApiError::from_status(400, "timeoutMs must be at least 1000");
        assert!(!error.is_timeout_message());
        assert!(DataApiError::unknown("Request Timeout").is_timeout_message());
        assert!(DataApiError::unknown("navigation timeout exceeded").is_timeout_message());
    }

    #[test]
    fn test_context_prefixes_message_and_keeps_classification() {
        let error = DataApiError::from_status(503, "unavailable")
            .permanent()
            .context("Failed to resolve user records");

        assert_eq!(error.message, "Failed to resolve user records: unavailable");
        assert_eq!(error.kind, ErrorKind::Server);
        assert_eq!(error.status, Some(503));
        assert!(error.permanent);
    }

    #[test]
    fn test_display_uses_taxonomy_name() {
        let error = DataApiError::from_status(503, "unavailable");
        assert_eq!(error.to_string(), "SERVER_ERROR: unavailable");
    }
}
