//! Cache trait for raw provider responses.
//!
//! This module defines the [`ResponseCache`] trait that memoizes symbol
//! listings and raw fundamentals documents by their exact request arguments.

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{RawPayload, Symbol},
};

/// Trait for caching raw provider responses.
///
/// Listings are keyed by `(provider, exchange_tag)` and fundamentals by
/// `(provider, composite_symbol)`. Entries are immutable once written.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Retrieves a cached symbol listing.
    ///
    /// Returns `Ok(Some(symbols))` if cached, `Ok(None)` if not cached.
    async fn get_symbols(&self, provider: &str, exchange_tag: &str) -> Result<Option<Vec<Symbol>>>;

    /// Stores a symbol listing.
    async fn put_symbols(&self, provider: &str, exchange_tag: &str, symbols: &[Symbol])
    -> Result<()>;

    /// Retrieves a cached fundamentals document.
    ///
    /// Returns `Ok(Some(payload))` if cached, `Ok(None)` if not cached.
    async fn get_fundamentals(
        &self,
        provider: &str,
        composite_symbol: &str,
    ) -> Result<Option<RawPayload>>;

    /// Stores a fundamentals document.
    async fn put_fundamentals(
        &self,
        provider: &str,
        composite_symbol: &str,
        payload: &RawPayload,
    ) -> Result<()>;

    /// Number of cached entries (listings plus fundamentals).
    async fn len(&self) -> usize;

    /// Returns true if nothing is cached.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;
}
