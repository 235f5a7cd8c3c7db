use crate::services::subscription::{SubscriptionError, SubscriptionGateway};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Premium-status cache in front of a [`SubscriptionGateway`]
///
/// Ingestion resolves premium status for every matched user of every
/// posting; the cache keeps repeat users off the subscription service.
/// Errors are never cached.
pub struct CachedSubscriptionGateway {
    inner: Arc<dyn SubscriptionGateway>,
    cache: moka::future::Cache<String, bool>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedSubscriptionGateway {
    /// Create a new cached gateway
    pub fn new(inner: Arc<dyn SubscriptionGateway>, max_entries: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            size: self.cache.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }
}

#[async_trait]
impl SubscriptionGateway for CachedSubscriptionGateway {
    async fn is_premium(&self, user_id: &str) -> Result<bool, SubscriptionError> {
        if let Some(premium) = self.cache.get(user_id).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Premium cache hit: {}", user_id);
            return Ok(premium);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let premium = self.inner.is_premium(user_id).await?;
        self.cache.insert(user_id.to_string(), premium).await;

        tracing::trace!("Premium cache set: {} = {}", user_id, premium);
        Ok(premium)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}
