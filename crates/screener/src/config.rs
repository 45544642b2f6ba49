//! Run configuration loaded from TOML, the environment and the command line.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use screener_core::{FundamentalsProvider, ProviderId, Region, Result, ScreenError, ScreeningCriteria};

use crate::pipeline::PipelineOptions;

/// Environment variable selecting the provider.
pub(crate) const ENV_PROVIDER: &str = "SCREENER_PROVIDER";
/// Environment variable selecting the region.
pub(crate) const ENV_REGION: &str = "SCREENER_REGION";
/// Environment variable holding the API key.
pub(crate) const ENV_API_KEY: &str = "SCREENER_API_KEY";

const fn default_provider() -> ProviderId {
    ProviderId::Eodhd
}

const fn default_max_concurrency() -> usize {
    1
}

const fn default_request_timeout_secs() -> u64 {
    30
}

/// Settings for one screening run.
///
/// Optional fields fall back to the selected provider's own profile.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScreenerConfig {
    /// Data provider to screen with.
    #[serde(default = "default_provider")]
    pub provider: ProviderId,
    /// Region whose exchanges are screened.
    #[serde(default)]
    pub region: Region,
    /// Explicit exchange tags, replacing the provider's region map.
    #[serde(default)]
    pub exchanges: Option<Vec<String>>,
    /// Provider API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Maximum symbols per exchange.
    #[serde(default)]
    pub symbol_cap: Option<usize>,
    /// Progress is reported every this many checked symbols.
    #[serde(default)]
    pub progress_interval: Option<usize>,
    /// Maximum fetches in flight.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-call HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Screening thresholds.
    #[serde(default)]
    pub criteria: ScreeningCriteria,
}

impl std::fmt::Debug for ScreenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenerConfig")
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("exchanges", &self.exchanges)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("symbol_cap", &self.symbol_cap)
            .field("progress_interval", &self.progress_interval)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("criteria", &self.criteria)
            .finish()
    }
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            region: Region::default(),
            exchanges: None,
            api_key: None,
            symbol_cap: None,
            progress_interval: None,
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            criteria: ScreeningCriteria::default(),
        }
    }
}

impl ScreenerConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ScreenError::Configuration(format!("invalid config: {e}")))
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading config");
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScreenError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Override provider, region and API key from `SCREENER_*` variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(provider) = var(ENV_PROVIDER) {
            self.provider = provider.parse()?;
        }
        if let Some(region) = var(ENV_REGION) {
            self.region = region.parse()?;
        }
        if let Some(key) = var(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        Ok(())
    }

    /// Fails fast on settings that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.api_key().is_none() {
            return Err(ScreenError::Configuration(format!(
                "missing API key for {}; set api_key or {ENV_API_KEY}",
                self.provider
            )));
        }
        if self.exchanges.as_ref().is_some_and(Vec::is_empty) {
            return Err(ScreenError::Configuration(
                "exchanges is set but empty".to_string(),
            ));
        }
        if self.symbol_cap == Some(0) {
            return Err(ScreenError::Configuration(
                "symbol_cap must be at least 1".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ScreenError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ScreenError::Configuration(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The API key, if one is set and not blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Per-call HTTP timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pipeline settings for `provider`, with this config's overrides applied.
    #[must_use]
    pub fn pipeline_options(&self, provider: &dyn FundamentalsProvider) -> PipelineOptions {
        let mut options = PipelineOptions::for_provider(provider, self.region)
            .with_max_concurrency(self.max_concurrency)
            .with_criteria(self.criteria);
        if let Some(exchanges) = &self.exchanges {
            options = options.with_exchanges(exchanges.iter().cloned());
        }
        if let Some(cap) = self.symbol_cap {
            options = options.with_symbol_cap(cap);
        }
        if let Some(interval) = self.progress_interval {
            options = options.with_progress_interval(interval);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
        provider = "finnhub"
        region = "europe"
        exchanges = ["L", "DE"]
        api_key = "abc"
        symbol_cap = 25
        progress_interval = 5
        max_concurrency = 2
        request_timeout_secs = 10

        [criteria]
        pe_max = 18.0
        roe_min = 10.0
    "#;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_full_document() {
        let config = ScreenerConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.provider, ProviderId::Finnhub);
        assert_eq!(config.region, Region::Europe);
        assert_eq!(config.exchanges, Some(vec!["L".to_string(), "DE".to_string()]));
        assert_eq!(config.api_key(), Some("abc"));
        assert_eq!(config.symbol_cap, Some(25));
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.criteria.pe_max, 18.0);
        assert_eq!(config.criteria.roe_min, 10.0);
        // Unlisted thresholds keep their defaults
        assert_eq!(config.criteria.debt_equity_max, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = ScreenerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScreenerConfig::default());
        assert_eq!(config.provider, ProviderId::Eodhd);
        assert_eq!(config.region, Region::Us);
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let err = ScreenerConfig::from_toml_str(r#"provider = "bloomberg""#).unwrap_err();
        assert!(err.is_configuration());

        let mut config = ScreenerConfig::default();
        let err = config
            .apply_vars(vars(&[(ENV_PROVIDER, "bloomberg")]))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_file_and_env_accept_the_same_spellings() {
        let config = ScreenerConfig::from_toml_str(
            r#"
            provider = "Alpha_Vantage"
            region = "EU"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider, ProviderId::AlphaVantage);
        assert_eq!(config.region, Region::Europe);

        let from_file = ScreenerConfig::from_toml_str(r#"provider = "EODHD""#).unwrap();
        let mut from_env = ScreenerConfig {
            provider: ProviderId::Fmp,
            ..Default::default()
        };
        from_env
            .apply_vars(vars(&[(ENV_PROVIDER, "EODHD")]))
            .unwrap();
        assert_eq!(from_file.provider, from_env.provider);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ScreenerConfig::from_toml_str(FULL).unwrap();
        config
            .apply_vars(vars(&[
                (ENV_PROVIDER, "alphavantage"),
                (ENV_REGION, "us"),
                (ENV_API_KEY, "from-env"),
            ]))
            .unwrap();
        assert_eq!(config.provider, ProviderId::AlphaVantage);
        assert_eq!(config.region, Region::Us);
        assert_eq!(config.api_key(), Some("from-env"));

        // Blank variables are ignored
        config.apply_vars(vars(&[(ENV_API_KEY, "  ")])).unwrap();
        assert_eq!(config.api_key(), Some("from-env"));
    }

    #[test]
    fn test_validate_rejects() {
        let base = ScreenerConfig {
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        assert!(base.validate().is_ok());

        let missing_key = ScreenerConfig {
            api_key: Some("   ".to_string()),
            ..base.clone()
        };
        assert!(missing_key.validate().unwrap_err().is_configuration());

        let empty_exchanges = ScreenerConfig {
            exchanges: Some(Vec::new()),
            ..base.clone()
        };
        assert!(empty_exchanges.validate().is_err());

        let zero_cap = ScreenerConfig {
            symbol_cap: Some(0),
            ..base.clone()
        };
        assert!(zero_cap.validate().is_err());

        let zero_concurrency = ScreenerConfig {
            max_concurrency: 0,
            ..base
        };
        assert!(zero_concurrency.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ScreenerConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn test_missing_file() {
        let err = ScreenerConfig::from_file("/nonexistent/screener.toml").unwrap_err();
        assert!(err.is_configuration());
    }
}
