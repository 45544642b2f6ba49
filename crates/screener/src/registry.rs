//! Provider registry: the set of configured adapters and their shared cache.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use screener_cache::InMemoryCache;
use screener_core::{FundamentalsProvider, ProviderId, ResponseCache, Result, ScreenError};

use crate::config::ScreenerConfig;
use crate::pipeline::{Pipeline, PipelineOptions};

/// Registry of configured fundamentals providers.
///
/// Providers are keyed by [`ProviderId`]; registering a second adapter for
/// the same id replaces the first. All pipelines built from one registry
/// share its response cache, so repeated runs within a process reuse
/// earlier listings and fundamentals.
///
/// # Example
///
/// ```rust,ignore
/// use screener::{ProviderId, ProviderRegistry, PipelineOptions, Region};
///
/// let registry = ProviderRegistry::new().with_finnhub("api_key");
/// let provider = registry.get(ProviderId::Finnhub)?;
/// let options = PipelineOptions::for_provider(provider.as_ref(), Region::Europe);
/// let pipeline = registry.pipeline(ProviderId::Finnhub, options)?;
/// ```
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn FundamentalsProvider>>,
    cache: Arc<dyn ResponseCache>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.providers.keys().map(ProviderId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .finish_non_exhaustive()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            cache: Arc::new(InMemoryCache::new()),
        }
    }
}

impl ProviderRegistry {
    /// Create an empty registry with an in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the provider selected by `config`, built with its
    /// API key and request timeout.
    pub fn from_config(config: &ScreenerConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            ScreenError::Configuration(format!("missing API key for {}", config.provider))
        })?;
        let provider = build_provider(config.provider, api_key, config)?;

        let mut registry = Self::new();
        registry.register(provider);
        Ok(registry)
    }

    /// Replace the response cache shared by pipelines built from now on.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Register a provider under its own id.
    pub fn register(&mut self, provider: Arc<dyn FundamentalsProvider>) {
        debug!(provider = provider.name(), id = %provider.id(), "Registering provider");
        self.providers.insert(provider.id(), provider);
    }

    /// Look up a registered provider.
    pub fn get(&self, id: ProviderId) -> Result<Arc<dyn FundamentalsProvider>> {
        self.providers.get(&id).cloned().ok_or_else(|| {
            ScreenError::ProviderNotConfigured(format!("{id} is not registered"))
        })
    }

    /// Ids of the registered providers.
    pub fn ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.providers.keys().copied()
    }

    /// The response cache shared by this registry's pipelines.
    #[must_use]
    pub fn cache(&self) -> Arc<dyn ResponseCache> {
        Arc::clone(&self.cache)
    }

    /// Build a pipeline for a registered provider.
    pub fn pipeline(&self, id: ProviderId, options: PipelineOptions) -> Result<Pipeline> {
        let provider = self.get(id)?;
        Ok(Pipeline::new(provider, self.cache(), options))
    }

    /// Build the pipeline described by `config`.
    ///
    /// The options are validated here, so an unusable region or override
    /// fails before any request is made.
    pub fn pipeline_for(&self, config: &ScreenerConfig) -> Result<Pipeline> {
        let provider = self.get(config.provider)?;
        let options = config.pipeline_options(provider.as_ref());
        options.validate()?;
        Ok(Pipeline::new(provider, self.cache(), options))
    }

    // Builder methods for easy setup with specific providers

    /// Add the EOD Historical Data provider.
    #[cfg(feature = "eodhd")]
    #[must_use]
    pub fn with_eodhd(mut self, api_token: &str) -> Self {
        self.register(Arc::new(screener_eodhd::EodhdProvider::new(api_token)));
        self
    }

    /// Add the Financial Modeling Prep provider.
    #[cfg(feature = "fmp")]
    #[must_use]
    pub fn with_fmp(mut self, api_key: &str) -> Self {
        self.register(Arc::new(screener_fmp::FmpProvider::new(api_key)));
        self
    }

    /// Add the Finnhub provider.
    #[cfg(feature = "finnhub")]
    #[must_use]
    pub fn with_finnhub(mut self, api_key: &str) -> Self {
        self.register(Arc::new(screener_finnhub::FinnhubProvider::new(api_key)));
        self
    }

    /// Add the Alpha Vantage provider.
    #[cfg(feature = "alphavantage")]
    #[must_use]
    pub fn with_alphavantage(mut self, api_key: &str) -> Self {
        self.register(Arc::new(
            screener_alphavantage::AlphaVantageProvider::new(api_key),
        ));
        self
    }
}

/// Construct the adapter for `id`, or fail if its feature is compiled out.
#[allow(unused_variables)]
fn build_provider(
    id: ProviderId,
    api_key: &str,
    config: &ScreenerConfig,
) -> Result<Arc<dyn FundamentalsProvider>> {
    let timeout = config.request_timeout();
    match id {
        #[cfg(feature = "eodhd")]
        ProviderId::Eodhd => Ok(Arc::new(
            screener_eodhd::EodhdProvider::new(api_key).with_timeout(timeout),
        )),
        #[cfg(feature = "fmp")]
        ProviderId::Fmp => Ok(Arc::new(
            screener_fmp::FmpProvider::new(api_key).with_timeout(timeout),
        )),
        #[cfg(feature = "finnhub")]
        ProviderId::Finnhub => Ok(Arc::new(
            screener_finnhub::FinnhubProvider::new(api_key).with_timeout(timeout),
        )),
        #[cfg(feature = "alphavantage")]
        ProviderId::AlphaVantage => Ok(Arc::new(
            screener_alphavantage::AlphaVantageProvider::new(api_key).with_timeout(timeout),
        )),
        #[allow(unreachable_patterns)]
        other => Err(ScreenError::ProviderNotConfigured(format!(
            "{other} support is not compiled in"
        ))),
    }
}

#[cfg(all(
    test,
    feature = "eodhd",
    feature = "fmp",
    feature = "finnhub",
    feature = "alphavantage"
))]
mod tests {
    use super::*;
    use screener_core::Region;

    fn config(provider: ProviderId) -> ScreenerConfig {
        ScreenerConfig {
            provider,
            api_key: Some("k".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_config_registers_selected_provider() {
        for id in ProviderId::ALL {
            let registry = ProviderRegistry::from_config(&config(id)).unwrap();
            assert_eq!(registry.ids().collect::<Vec<_>>(), vec![id]);
            assert_eq!(registry.get(id).unwrap().id(), id);
        }
    }

    #[test]
    fn test_missing_provider() {
        let registry = ProviderRegistry::new().with_fmp("k");
        let err = registry.get(ProviderId::Eodhd).unwrap_err();
        assert!(matches!(err, ScreenError::ProviderNotConfigured(_)));
    }

    #[test]
    fn test_from_config_requires_key() {
        let err = ProviderRegistry::from_config(&ScreenerConfig::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_pipeline_for_applies_overrides() {
        let mut cfg = config(ProviderId::Eodhd);
        cfg.region = Region::Europe;
        cfg.symbol_cap = Some(7);
        cfg.max_concurrency = 3;

        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        let pipeline = registry.pipeline_for(&cfg).unwrap();
        let options = pipeline.options();
        assert_eq!(options.exchanges, vec!["LSE", "XETRA", "SW", "PA", "MI"]);
        assert_eq!(options.symbol_cap, 7);
        assert_eq!(options.progress_interval, 20);
        assert_eq!(options.max_concurrency, 3);
    }

    #[test]
    fn test_alphavantage_outside_us_is_rejected_before_listing() {
        let mut cfg = config(ProviderId::AlphaVantage);
        cfg.region = Region::Asia;

        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        let err = registry.pipeline_for(&cfg).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_builders_register_each_provider() {
        let registry = ProviderRegistry::new()
            .with_eodhd("a")
            .with_fmp("b")
            .with_finnhub("c")
            .with_alphavantage("d");
        let mut ids: Vec<_> = registry.ids().collect();
        ids.sort_by_key(|id| id.as_str());
        assert_eq!(ids.len(), 4);
        assert!(format!("{registry:?}").contains("finnhub"));
    }
}
