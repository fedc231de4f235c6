use super::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::common::{DataApiError, DataApiResult, RateLimiter};
use crate::config::AdapterConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Header used for tenant scoping when multi-tenancy is configured.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Default authorization header; values are sent as `Bearer <key>`.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    default_headers: BTreeMap<String, String>,
    default_timeout: Duration,
    rate_limiter: Option<RateLimiter>,
}

impl ReqwestTransport {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            default_headers: BTreeMap::new(),
            default_timeout,
            rate_limiter: None,
        }
    }

    /// Builds a transport carrying the auth, tenant and throttling settings
    /// of a validated configuration.
    pub fn from_config(config: &AdapterConfig) -> Self {
        let mut transport = Self::new(config.timeout);

        if let Some(api_key) = &config.api_key {
            transport = transport.with_api_key(config.auth_header.as_deref(), api_key);
        }
        if let Some(tenant_id) = &config.tenant_id {
            transport = transport.with_header(TENANT_HEADER, tenant_id);
        }
        if let Some(rate_limit) = &config.rate_limit {
            transport = transport.with_rate_limiter(rate_limit.build());
        }

        transport
    }

    /// Authenticates every request. Without a custom header name the key is
    /// sent as a bearer token.
    pub fn with_api_key(self, header: Option<&str>, api_key: &str) -> Self {
        match header {
            Some(name) if !name.eq_ignore_ascii_case(AUTHORIZATION_HEADER) => {
                self.with_header(name, api_key)
            }
            _ => self.with_header(AUTHORIZATION_HEADER, format!("Bearer {api_key}")),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> DataApiResult<HttpResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait_until_ready().await;
        }

        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let mut builder = self
            .http_client
            .request(Self::method(request.method), &request.url)
            .timeout(timeout)
            .header("Accept", "application/json");

        for (name, value) in self.default_headers.iter().chain(request.headers.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        log::debug!("{} {}", request.method, request.url);

        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, &request.url, timeout))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, &request.url, timeout))?;
        let body = parse_body(&text);

        if !(200..300).contains(&status) {
            let message = error_message(&body)
                .unwrap_or_else(|| format!("HTTP {status} from {} {}", request.method, request.url));
            log::debug!("{} {} failed with HTTP {status}", request.method, request.url);
            return Err(DataApiError::from_status(status, message));
        }

        Ok(HttpResponse { status, body })
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Pulls a human-readable message out of common error envelopes.
fn error_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| map.get("error").and_then(Value::as_str))
            .or_else(|| {
                map.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string),
        _ => None,
    }
}

fn map_reqwest_error(error: reqwest::Error, url: &str, timeout: Duration) -> DataApiError {
    if error.is_timeout() {
        DataApiError::timeout(format!("Request to {url} timed out after {timeout:?}"))
            .with_code("ETIMEDOUT")
    } else if error.is_connect() {
        DataApiError::network(format!("Connection to {url} failed: {error}"))
            .with_code("ECONNREFUSED")
    } else if let Some(status) = error.status() {
        DataApiError::from_status(status.as_u16(), error.to_string())
    } else if error.is_request() || error.is_body() {
        DataApiError::network(format!("Request to {url} failed: {error}"))
    } else {
        DataApiError::unknown(format!("Request to {url} failed: {error}"))
    }
}
