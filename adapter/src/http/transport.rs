use crate::common::DataApiResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// HTTP verbs used against the data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Successful response. Non-2xx statuses are reported as errors by the
/// transport, so `status` here is always a success code.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// Transport used by every component that talks to the data API.
///
/// Implementations map non-success statuses and transport failures onto
/// [`DataApiError`](crate::common::DataApiError) so that callers only ever
/// see the shared taxonomy.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> DataApiResult<HttpResponse>;

    async fn get(&self, url: &str) -> DataApiResult<HttpResponse> {
        self.send(HttpRequest::new(HttpMethod::Get, url)).await
    }

    async fn post(&self, url: &str, body: Value) -> DataApiResult<HttpResponse> {
        self.send(HttpRequest::new(HttpMethod::Post, url).with_body(body))
            .await
    }

    async fn patch(&self, url: &str, body: Value) -> DataApiResult<HttpResponse> {
        self.send(HttpRequest::new(HttpMethod::Patch, url).with_body(body))
            .await
    }

    async fn delete(&self, url: &str) -> DataApiResult<HttpResponse> {
        self.send(HttpRequest::new(HttpMethod::Delete, url)).await
    }
}

pub type SharedTransport = Arc<dyn HttpTransport>;

/// Joins a base URL, an API path and optional path segment.
pub fn resource_url(base_url: &str, api_path: &str, id: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let path = api_path.trim_matches('/');
    match id {
        Some(id) => format!("{base}/{path}/{}", urlencoding::encode(id)),
        None => format!("{base}/{path}"),
    }
}

/// Appends equality filters as query parameters.
pub fn with_query(url: &str, filter: &crate::model::Where) -> String {
    if filter.is_empty() {
        return url.to_string();
    }

    let query = filter
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&rendered)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}
