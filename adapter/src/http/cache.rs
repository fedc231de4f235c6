use super::transport::{HttpRequest, HttpResponse, HttpTransport, SharedTransport};
use crate::common::DataApiResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CachedResponse {
    response: HttpResponse,
    stored_at: Instant,
}

/// TTL-bounded store for GET responses keyed by URL.
///
/// Every [`clear`](Self::clear) starts a new generation. Responses fetched
/// under an older generation are dropped by
/// [`set_if_current`](Self::set_if_current) instead of being stored.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CachedResponse>>>,
    generation: Arc<AtomicU64>,
    ttl: Duration,
    max_size: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            ttl,
            max_size: max_size.max(1),
        }
    }

    pub async fn get(&self, key: &str) -> Option<HttpResponse> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.response.clone())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn set(&self, key: String, response: HttpResponse) {
        let mut entries = self.entries.write().await;
        Self::insert(&mut entries, key, response, self.ttl, self.max_size);
    }

    /// Stores `response` only if no clear happened since `generation` was
    /// read. Returns whether it was stored.
    pub async fn set_if_current(&self, key: String, response: HttpResponse, generation: u64) -> bool {
        let mut entries = self.entries.write().await;
        if self.generation() != generation {
            return false;
        }
        Self::insert(&mut entries, key, response, self.ttl, self.max_size);
        true
    }

    fn insert(
        entries: &mut HashMap<String, CachedResponse>,
        key: String,
        response: HttpResponse,
        ttl: Duration,
        max_size: usize,
    ) {
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

        if entries.len() >= max_size && !entries.contains_key(&key) {
            // Evict the oldest entry
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CachedResponse {
                response,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Serves repeated GETs from a [`ResponseCache`]; any mutation clears it.
pub struct CachedTransport {
    inner: SharedTransport,
    cache: ResponseCache,
}

impl CachedTransport {
    pub fn new(inner: SharedTransport, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl HttpTransport for CachedTransport {
    async fn send(&self, request: HttpRequest) -> DataApiResult<HttpResponse> {
        if request.method.is_mutation() {
            let response = self.inner.send(request).await;
            // Any mutation invalidates every cached read
            self.cache.clear().await;
            return response;
        }

        if let Some(hit) = self.cache.get(&request.url).await {
            log::debug!("Cache hit for {}", request.url);
            return Ok(hit);
        }

        let generation = self.cache.generation();
        let url = request.url.clone();
        let response = self.inner.send(request).await?;
        if !self.cache.set_if_current(url.clone(), response.clone(), generation).await {
            log::debug!("Not caching {url}; cache was cleared while the request was in flight");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> DataApiResult<HttpResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::ok(json!({ "call": n })))
        }
    }

    #[tokio::test]
    async fn test_get_is_cached_until_mutation() {
        let inner = Arc::new(CountingTransport::default());
        let transport = CachedTransport::new(
            inner.clone(),
            ResponseCache::new(Duration::from_secs(60), 10),
        );

        let first = transport.get("https://x/users/1").await.unwrap();
        let second = transport.get("https://x/users/1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        transport.delete("https://x/users/1").await.unwrap();
        transport.get("https://x/users/1").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    /// Reads snapshot the version when they start; deletes bump it.
    #[derive(Default)]
    struct VersionedTransport {
        version: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for VersionedTransport {
        async fn send(&self, request: HttpRequest) -> DataApiResult<HttpResponse> {
            if request.method.is_mutation() {
                let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
                return Ok(HttpResponse::ok(json!({ "version": version })));
            }
            let version = self.version.load(Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(HttpResponse::ok(json!({ "version": version })))
        }
    }

    #[tokio::test]
    async fn test_read_overlapping_a_mutation_is_not_cached() {
        let transport = CachedTransport::new(
            Arc::new(VersionedTransport::default()),
            ResponseCache::new(Duration::from_secs(60), 10),
        );

        let (read, write) = tokio::join!(transport.get("https://x/users/1"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            transport.delete("https://x/users/1").await
        });
        assert_eq!(read.unwrap().body, json!({ "version": 0 }));
        write.unwrap();

        let after = transport.get("https://x/users/1").await.unwrap();
        assert_eq!(after.body, json!({ "version": 1 }));
    }

    #[tokio::test]
    async fn test_stale_generation_is_rejected() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        let generation = cache.generation();
        cache.clear().await;

        assert!(!cache.set_if_current("k".to_string(), HttpResponse::ok(json!(1)), generation).await);
        assert!(cache.is_empty().await);
        assert!(
            cache
                .set_if_current("k".to_string(), HttpResponse::ok(json!(2)), cache.generation())
                .await
        );
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_ignored() {
        let cache = ResponseCache::new(Duration::from_millis(10), 10);
        cache.set("k".to_string(), HttpResponse::ok(json!(1))).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_max_size_evicts_oldest() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.set("a".to_string(), HttpResponse::ok(json!("a"))).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("b".to_string(), HttpResponse::ok(json!("b"))).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("c".to_string(), HttpResponse::ok(json!("c"))).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("c").await.is_some());
    }
}
