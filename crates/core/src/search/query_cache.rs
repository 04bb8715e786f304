//! Bounded TTL cache for query embeddings
//!
//! Repeated searches for the same text skip the provider round trip.
//! Concurrent misses on one key are coalesced into a single provider call.

use crate::error::{PaperSearchError, Result};
use crate::types::EmbeddingVector;
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_IDLE: Duration = Duration::from_secs(1800);

/// Query text to embedding, keyed by the normalized query
#[derive(Clone)]
pub struct QueryEmbeddingCache {
    cache: Cache<String, Arc<EmbeddingVector>>,
}

impl QueryEmbeddingCache {
    /// Cache holding up to `capacity` queries for one hour (30 minutes idle)
    pub fn new(capacity: u64) -> Self {
        Self::with_ttl(capacity, DEFAULT_TTL, DEFAULT_IDLE)
    }

    pub fn with_ttl(capacity: u64, ttl: Duration, idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .time_to_idle(idle)
            .build();

        debug!(
            "Created query embedding cache with capacity {}, TTL {:?}, idle {:?}",
            capacity, ttl, idle
        );

        Self { cache }
    }

    pub async fn insert(&self, query: impl Into<String>, embedding: EmbeddingVector) {
        self.cache.insert(query.into(), Arc::new(embedding)).await;
    }

    pub async fn get(&self, query: &str) -> Option<Arc<EmbeddingVector>> {
        let hit = self.cache.get(query).await;
        trace!(
            "Query cache {} for '{}'",
            if hit.is_some() { "hit" } else { "miss" },
            query
        );
        hit
    }

    pub async fn invalidate(&self, query: &str) {
        self.cache.invalidate(query).await;
    }

    /// Drop every entry
    pub async fn clear(&self) {
        debug!("Clearing query embedding cache");
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Approximate number of cached queries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Return the cached embedding for `query`, computing it on a miss
    ///
    /// Errors are not cached; the next call retries.
    pub async fn get_or_compute<F, Fut>(&self, query: &str, compute: F) -> Result<Arc<EmbeddingVector>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<EmbeddingVector>>,
    {
        let key = query.to_string();
        self.cache
            .try_get_with(key.clone(), async move { compute(key).await.map(Arc::new) })
            .await
            .map_err(unshare)
    }
}

impl Default for QueryEmbeddingCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Recover an owned error from moka's shared one
///
/// Waiters that joined someone else's computation only see the `Arc`; they get
/// an equivalent error of the same kind.
fn unshare(error: Arc<PaperSearchError>) -> PaperSearchError {
    match Arc::try_unwrap(error) {
        Ok(owned) => owned,
        Err(shared) => match shared.as_ref() {
            PaperSearchError::Timeout { operation } => PaperSearchError::timeout(operation.clone()),
            PaperSearchError::InvalidRequest { message } => {
                PaperSearchError::invalid_request(message.clone())
            }
            PaperSearchError::DimensionMismatch { expected, actual } => {
                PaperSearchError::dimension_mismatch(*expected, *actual)
            }
            PaperSearchError::Network { message } => PaperSearchError::network(message.clone()),
            PaperSearchError::Provider { message } => PaperSearchError::provider(message.clone()),
            other => PaperSearchError::provider(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_insert_get_invalidate() {
        let cache = QueryEmbeddingCache::new(10);
        cache.insert("graph neural networks", vec![0.1, 0.2]).await;

        assert_eq!(
            *cache.get("graph neural networks").await.unwrap(),
            vec![0.1, 0.2]
        );
        assert!(cache.get("transformers").await.is_none());

        cache.invalidate("graph neural networks").await;
        assert!(cache.get("graph neural networks").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_and_entry_count() {
        let cache = QueryEmbeddingCache::default();
        cache.insert("a", vec![1.0]).await;
        cache.insert("b", vec![2.0]).await;
        cache.cache.run_pending_tasks().await;
        assert_eq!(cache.entry_count(), 2);

        cache.clear().await;
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_get_or_compute_computes_once() {
        let cache = QueryEmbeddingCache::new(10);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let embedding = cache
                .get_or_compute("diffusion models", |q| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        assert_eq!(q, "diffusion models");
                        Ok(vec![0.5, 0.5])
                    }
                })
                .await
                .unwrap();
            assert_eq!(*embedding, vec![0.5, 0.5]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_does_not_cache_errors() {
        let cache = QueryEmbeddingCache::new(10);

        let result = cache
            .get_or_compute("q", |_| async { Err(PaperSearchError::timeout("embed query")) })
            .await;
        assert!(matches!(result, Err(PaperSearchError::Timeout { .. })));

        let result = cache.get_or_compute("q", |_| async { Ok(vec![1.0]) }).await;
        assert_eq!(*result.unwrap(), vec![1.0]);
    }

    #[test]
    fn test_unshare_keeps_error_kind() {
        let shared = Arc::new(PaperSearchError::timeout("embed"));
        let _other_waiter = shared.clone();
        assert!(matches!(unshare(shared), PaperSearchError::Timeout { .. }));
    }
}
