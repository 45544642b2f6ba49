#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/screener/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Financial Modeling Prep (FMP) data provider.
//!
//! This crate implements the screener-core traits for the
//! [Financial Modeling Prep](https://financialmodelingprep.com/) API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use screener_core::FundamentalsProvider;
//! use screener_fmp::{FmpProvider, normalize};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = FmpProvider::new("your_api_key");
//!
//!     let symbols = provider.list_symbols("NASDAQ").await?;
//!     let raw = provider.fetch_fundamentals(symbols[0].as_str()).await?;
//!     println!("{:?}", normalize(&raw));
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use screener_core::normalize::{Unit, first_entry, metric_at};
use screener_core::{
    DataProvider, FundamentalSnapshot, FundamentalsProvider, ProviderId, ProviderProfile,
    RawPayload, Region, Result, ScreenError, Symbol,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

/// Base URL for the FMP stable API.
const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Default per-call timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// 300 calls per minute on the starter plan; a fetch is three calls.
const PROFILE: ProviderProfile =
    ProviderProfile::new(Duration::from_millis(200), 300, 50).with_requests_per_fetch(3);

const US_EXCHANGES: &[&str] = &["NASDAQ", "NYSE", "AMEX"];
const EUROPE_EXCHANGES: &[&str] = &["LSE", "XETRA", "EURONEXT", "SIX"];
const ASIA_EXCHANGES: &[&str] = &["JPX", "HKSE", "KSC"];

/// Financial Modeling Prep data provider.
///
/// Provides access to:
/// - Exchange listings via the company screener
/// - TTM ratios and key metrics
/// - Financial growth figures
#[derive(Clone)]
pub struct FmpProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for FmpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FmpProvider {
    /// Create a new FMP provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key)
    }

    /// Create a new FMP provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: FMP_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the provider at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make a GET request and parse the JSON response.
    ///
    /// Query values, the API key included, are encoded by the client.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        tracing::debug!("FMP request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScreenError::RateLimited {
                provider: "FMP".to_string(),
                retry_after: None,
            });
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ScreenError::AuthenticationFailed("FMP".to_string()));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScreenError::Http { status, body });
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        // Check for FMP error responses
        if text.contains("\"Error Message\"") {
            return Err(ScreenError::Other(text));
        }

        serde_json::from_str(&text).map_err(|e| ScreenError::Parse(format!("{e}: {text}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> ScreenError {
        if err.is_timeout() {
            ScreenError::Timeout(self.timeout)
        } else {
            ScreenError::Network(err.to_string())
        }
    }
}

impl DataProvider for FmpProvider {
    fn name(&self) -> &str {
        "FMP"
    }

    fn description(&self) -> &str {
        "Financial Modeling Prep - Financial data and stock market API"
    }
}

#[async_trait]
impl FundamentalsProvider for FmpProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Fmp
    }

    fn profile(&self) -> ProviderProfile {
        PROFILE
    }

    fn exchanges(&self, region: Region) -> &'static [&'static str] {
        match region {
            Region::Us => US_EXCHANGES,
            Region::Europe => EUROPE_EXCHANGES,
            Region::Asia => ASIA_EXCHANGES,
        }
    }

    async fn list_symbols(&self, exchange_tag: &str) -> Result<Vec<Symbol>> {
        let rows: Vec<Value> = self
            .get(
                "company-screener",
                &[("exchange", exchange_tag), ("isActivelyTrading", "true")],
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<FmpScreenerRow>(row) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::debug!(exchange = exchange_tag, error = %e, "Skipping malformed screener row");
                    None
                }
            })
            .filter_map(|row| {
                let symbol = row.symbol.filter(|s| !s.is_empty())?;
                Some(
                    Symbol::new(symbol, exchange_tag)
                        .with_display_name(row.company_name.unwrap_or_default()),
                )
            })
            .collect())
    }

    async fn fetch_fundamentals(&self, composite_symbol: &str) -> Result<RawPayload> {
        let symbol = [("symbol", composite_symbol)];
        let ratios: Value = self.get("ratios-ttm", &symbol).await?;

        if ratios.as_array().is_some_and(Vec::is_empty) {
            return Err(ScreenError::SymbolNotFound(composite_symbol.to_string()));
        }

        let key_metrics: Value = self.get("key-metrics-ttm", &symbol).await?;
        let growth: Value = self
            .get(
                "financial-growth",
                &[("symbol", composite_symbol), ("limit", "1")],
            )
            .await?;

        Ok(RawPayload::new(json!({
            "ratios": ratios,
            "keyMetrics": key_metrics,
            "growth": growth,
        })))
    }
}

/// Maps an assembled FMP document onto the canonical snapshot.
///
/// Each section is a list whose first element is the most recent record.
#[must_use]
pub fn normalize(raw: &RawPayload) -> FundamentalSnapshot {
    let doc = raw.as_value();
    let latest = |section: &str| doc.get(section).and_then(first_entry);

    let ratios = latest("ratios");
    let key_metrics = latest("keyMetrics");
    let growth = latest("growth");

    FundamentalSnapshot::new(
        ratios.and_then(|r| metric_at(r, &["priceToEarningsRatioTTM"], Unit::Ratio)),
        ratios.and_then(|r| metric_at(r, &["debtToEquityRatioTTM"], Unit::Ratio)),
        key_metrics.and_then(|m| metric_at(m, &["returnOnEquityTTM"], Unit::Fraction)),
        key_metrics.and_then(|m| metric_at(m, &["returnOnInvestedCapitalTTM"], Unit::Fraction)),
        growth.and_then(|g| metric_at(g, &["epsgrowth"], Unit::Fraction)),
    )
}

// ============================================================================
// FMP API Response Types
// ============================================================================

/// FMP company screener row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpScreenerRow {
    #[serde(default)]
    symbol: Option<String>,
    company_name: Option<String>,
}
