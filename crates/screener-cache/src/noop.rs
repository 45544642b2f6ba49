//! No-op cache implementation.

use async_trait::async_trait;
use screener_core::{RawPayload, ResponseCache, Result, Symbol};
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// All `get_*` methods return `Ok(None)` and all `put_*` methods return `Ok(())`.
/// Useful for disabling caching, so every request reaches the provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get_symbols(&self, _provider: &str, _exchange_tag: &str) -> Result<Option<Vec<Symbol>>> {
        trace!("NoopCache: get_symbols called, returning None");
        Ok(None)
    }

    async fn put_symbols(
        &self,
        _provider: &str,
        _exchange_tag: &str,
        _symbols: &[Symbol],
    ) -> Result<()> {
        trace!("NoopCache: put_symbols called, doing nothing");
        Ok(())
    }

    async fn get_fundamentals(
        &self,
        _provider: &str,
        _composite_symbol: &str,
    ) -> Result<Option<RawPayload>> {
        trace!("NoopCache: get_fundamentals called, returning None");
        Ok(None)
    }

    async fn put_fundamentals(
        &self,
        _provider: &str,
        _composite_symbol: &str,
        _payload: &RawPayload,
    ) -> Result<()> {
        trace!("NoopCache: put_fundamentals called, doing nothing");
        Ok(())
    }

    async fn len(&self) -> usize {
        0
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopCache: clear called, doing nothing");
        Ok(())
    }
}
