//! In-memory embedding cache for text encoders.
//!
//! [`CachedEncoder`] wraps any [`TextEncoder`] and memoises embeddings by
//! variant text. Uses [`moka`] for async-friendly caching with configurable
//! capacity, TTL and automatic eviction. Failures are never cached.

use std::time::Duration;

use moka::future::Cache;

use crate::config::FusionConfig;
use crate::encoder::TextEncoder;
use crate::error::FusionError;

/// A [`TextEncoder`] decorator that caches successful encodings.
#[derive(Debug)]
pub struct CachedEncoder<E> {
    inner: E,
    /// `None` when caching is disabled (`ttl == 0`).
    cache: Option<Cache<String, Vec<f32>>>,
}

impl<E: TextEncoder> CachedEncoder<E> {
    /// Wrap `inner` using the cache settings in `config`.
    pub fn new(inner: E, config: &FusionConfig) -> Self {
        let cache = (config.embedding_cache_ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(config.embedding_cache_capacity)
                .time_to_live(Duration::from_secs(config.embedding_cache_ttl_seconds))
                .build()
        });
        Self { inner, cache }
    }

    /// The wrapped encoder.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Number of cached embeddings (approximate, for diagnostics).
    pub fn cached_entries(&self) -> u64 {
        self.cache.as_ref().map_or(0, Cache::entry_count)
    }
}

impl<E: TextEncoder> TextEncoder for CachedEncoder<E> {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, FusionError> {
        let Some(cache) = &self.cache else {
            return self.inner.encode(text).await;
        };
        if let Some(hit) = cache.get(text).await {
            tracing::trace!(text, "embedding cache hit");
            return Ok(hit);
        }
        let embedding = self.inner.encode(text).await?;
        cache.insert(text.to_owned(), embedding.clone()).await;
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
