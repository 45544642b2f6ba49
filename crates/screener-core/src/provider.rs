//! Provider traits for listing symbols and fetching fundamentals.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`FundamentalsProvider`] - Symbol listing and raw fundamentals fetch
//!
//! and [`ProviderProfile`], the per-provider policy defaults (rate limit,
//! universe cap, progress cadence) the pipeline applies.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::{
    error::Result,
    region::{ProviderId, Region},
    types::{RawPayload, Symbol},
};

/// Base trait for all data providers.
///
/// All data providers must implement this trait to provide basic metadata
/// about the provider.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "EODHD").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Policy defaults a provider documents for itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Minimum delay between two network calls to this provider.
    pub min_interval: Duration,
    /// Maximum number of symbols screened per exchange.
    pub symbol_cap: usize,
    /// Progress is reported after every this many checked symbols.
    pub progress_interval: usize,
    /// HTTP requests one fundamentals fetch issues; each costs a limiter slot.
    pub requests_per_fetch: u32,
}

impl ProviderProfile {
    /// Creates a profile.
    #[must_use]
    pub const fn new(min_interval: Duration, symbol_cap: usize, progress_interval: usize) -> Self {
        Self {
            min_interval,
            symbol_cap,
            progress_interval,
            requests_per_fetch: 1,
        }
    }

    /// Declares how many requests a fundamentals fetch takes.
    #[must_use]
    pub const fn with_requests_per_fetch(mut self, requests: u32) -> Self {
        self.requests_per_fetch = requests;
        self
    }
}

/// Provider of symbol universes and raw fundamentals.
///
/// Adapters only translate HTTP; they never interpret the fundamentals
/// payload, never sleep to honor rate limits and never cache. Those concerns
/// belong to the normalizer and the pipeline.
#[async_trait]
pub trait FundamentalsProvider: DataProvider {
    /// Tag selecting this provider's normalizer.
    fn id(&self) -> ProviderId;

    /// Rate-limit contract and run defaults of this provider.
    fn profile(&self) -> ProviderProfile;

    /// Exchange tags this provider uses for a region.
    fn exchanges(&self, region: Region) -> &'static [&'static str];

    /// Lists the common stocks of one exchange.
    ///
    /// Transport errors, malformed bodies and bodies that are not a list are
    /// reported as errors; the pipeline degrades them to an empty listing.
    async fn list_symbols(&self, exchange_tag: &str) -> Result<Vec<Symbol>>;

    /// Fetches the raw fundamentals document for a composite symbol.
    ///
    /// When the provider needs several requests, any failing request fails
    /// the whole fetch.
    async fn fetch_fundamentals(&self, composite_symbol: &str) -> Result<RawPayload>;
}
