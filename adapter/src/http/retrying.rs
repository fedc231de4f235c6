use super::transport::{HttpRequest, HttpResponse, HttpTransport, SharedTransport};
use crate::common::{DataApiResult, RetryExecutor};
use async_trait::async_trait;

/// Wraps a transport so that every request goes through a [`RetryExecutor`].
pub struct RetryingTransport {
    inner: SharedTransport,
    executor: RetryExecutor,
}

impl RetryingTransport {
    pub fn new(inner: SharedTransport, executor: RetryExecutor) -> Self {
        Self { inner, executor }
    }
}

#[async_trait]
impl HttpTransport for RetryingTransport {
    async fn send(&self, request: HttpRequest) -> DataApiResult<HttpResponse> {
        let context = format!("{} {}", request.method, request.url);
        self.executor
            .execute_with_retry(&context, || self.inner.send(request.clone()))
            .await
    }
}
