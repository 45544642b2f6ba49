//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use screener_core::{RawPayload, ResponseCache, Result, Symbol};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Cache entry with the time it was written.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    fn age_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .num_milliseconds()
    }
}

/// Key for listing cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ListingKey {
    provider: String,
    exchange_tag: String,
}

/// Key for fundamentals cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FundamentalsKey {
    provider: String,
    composite_symbol: String,
}

/// In-memory response cache.
///
/// Data is stored in `RwLock`-protected `HashMap`s and lives as long as the
/// cache itself. Nothing is evicted. Values are cloned on get/put.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    listings: RwLock<HashMap<ListingKey, CacheEntry<Vec<Symbol>>>>,
    fundamentals: RwLock<HashMap<FundamentalsKey, CacheEntry<RawPayload>>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    #[instrument(skip(self), fields(provider = %provider, exchange = %exchange_tag))]
    async fn get_symbols(&self, provider: &str, exchange_tag: &str) -> Result<Option<Vec<Symbol>>> {
        let key = ListingKey {
            provider: provider.to_string(),
            exchange_tag: exchange_tag.to_string(),
        };

        let cache = self.listings.read().await;
        match cache.get(&key) {
            Some(entry) => {
                debug!(age_ms = entry.age_ms(), "Cache hit for symbol listing");
                Ok(Some(entry.data.clone()))
            }
            None => {
                debug!("Cache miss for symbol listing");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, symbols), fields(provider = %provider, exchange = %exchange_tag, count = symbols.len()))]
    async fn put_symbols(
        &self,
        provider: &str,
        exchange_tag: &str,
        symbols: &[Symbol],
    ) -> Result<()> {
        let key = ListingKey {
            provider: provider.to_string(),
            exchange_tag: exchange_tag.to_string(),
        };

        let mut cache = self.listings.write().await;
        cache.insert(key, CacheEntry::new(symbols.to_vec()));
        debug!("Cached {} symbols", symbols.len());
        Ok(())
    }

    #[instrument(skip(self), fields(provider = %provider, symbol = %composite_symbol))]
    async fn get_fundamentals(
        &self,
        provider: &str,
        composite_symbol: &str,
    ) -> Result<Option<RawPayload>> {
        let key = FundamentalsKey {
            provider: provider.to_string(),
            composite_symbol: composite_symbol.to_string(),
        };

        let cache = self.fundamentals.read().await;
        match cache.get(&key) {
            Some(entry) => {
                debug!(age_ms = entry.age_ms(), "Cache hit for fundamentals");
                Ok(Some(entry.data.clone()))
            }
            None => {
                debug!("Cache miss for fundamentals");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(provider = %provider, symbol = %composite_symbol))]
    async fn put_fundamentals(
        &self,
        provider: &str,
        composite_symbol: &str,
        payload: &RawPayload,
    ) -> Result<()> {
        let key = FundamentalsKey {
            provider: provider.to_string(),
            composite_symbol: composite_symbol.to_string(),
        };

        let mut cache = self.fundamentals.write().await;
        cache.insert(key, CacheEntry::new(payload.clone()));
        debug!("Cached fundamentals");
        Ok(())
    }

    async fn len(&self) -> usize {
        self.listings.read().await.len() + self.fundamentals.read().await.len()
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.listings.write().await.clear();
        self.fundamentals.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}
