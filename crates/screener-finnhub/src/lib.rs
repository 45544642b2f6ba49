#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/screener/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Finnhub data provider.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use screener_core::normalize::{Unit, first_entry, lookup, metric_at, number_at};
use screener_core::{
    DataProvider, FundamentalSnapshot, FundamentalsProvider, ProviderId, ProviderProfile,
    RawPayload, Region, Result, ScreenError, Symbol,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Finnhub REST API root.
const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Header carrying the API token.
const TOKEN_HEADER: &str = "X-Finnhub-Token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Free tier allows 60 calls per minute.
const PROFILE: ProviderProfile = ProviderProfile::new(Duration::from_secs(1), 300, 25);

const US_EXCHANGES: &[&str] = &["US"];
const EUROPE_EXCHANGES: &[&str] = &["L", "DE", "PA", "SW", "MI"];
const ASIA_EXCHANGES: &[&str] = &["T", "HK", "KS"];

/// Row of the `stock/symbol` listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolRow {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    display_symbol: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "type")]
    security_type: Option<String>,
}

impl SymbolRow {
    fn is_common_stock(&self) -> bool {
        self.security_type
            .as_deref()
            .is_none_or(|t| t.is_empty() || t == "Common Stock")
    }

    /// `None` for rows without a symbol.
    fn into_symbol(self, exchange_tag: &str) -> Option<Symbol> {
        let symbol = self.symbol.filter(|s| !s.is_empty())?;
        let code = self
            .display_symbol
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| symbol.clone());
        Some(
            Symbol::new(code, exchange_tag)
                .with_composite(symbol)
                .with_display_name(self.description.unwrap_or_default()),
        )
    }
}

/// Finnhub data provider.
#[derive(Clone)]
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for FinnhubProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinnhubProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key)
    }

    /// Create a new Finnhub provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: FINNHUB_BASE_URL.to_string(),
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

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        debug!(path, ?params, "Finnhub request");

        let response = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .header(TOKEN_HEADER, &self.api_key)
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(ScreenError::RateLimited {
                    provider: "Finnhub".to_string(),
                    retry_after,
                });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ScreenError::AuthenticationFailed("Finnhub".to_string()));
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ScreenError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
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

impl DataProvider for FinnhubProvider {
    fn name(&self) -> &str {
        "Finnhub"
    }

    fn description(&self) -> &str {
        "Finnhub - Real-time stock API with basic financials"
    }
}

#[async_trait]
impl FundamentalsProvider for FinnhubProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
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
            .get("stock/symbol", &[("exchange", exchange_tag)])
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<SymbolRow>(row) {
                Ok(row) => Some(row),
                Err(e) => {
                    debug!(exchange = exchange_tag, error = %e, "Skipping malformed listing row");
                    None
                }
            })
            .filter(SymbolRow::is_common_stock)
            .filter_map(|row| row.into_symbol(exchange_tag))
            .collect())
    }

    async fn fetch_fundamentals(&self, composite_symbol: &str) -> Result<RawPayload> {
        let body: Value = self
            .get(
                "stock/metric",
                &[("symbol", composite_symbol), ("metric", "all")],
            )
            .await?;

        // Unknown symbols come back as 200 with an empty metric block.
        let has_metrics = body
            .get("metric")
            .and_then(Value::as_object)
            .is_some_and(|m| !m.is_empty());
        if !has_metrics {
            return Err(ScreenError::SymbolNotFound(composite_symbol.to_string()));
        }

        Ok(RawPayload::new(body))
    }
}

/// Maps a Finnhub `stock/metric` document onto the canonical snapshot.
///
/// The `metric` block already reports returns and growth in percent. When
/// `roiTTM` is absent the newest annual `roic` series point is used; series
/// values are fractions.
#[must_use]
pub fn normalize(raw: &RawPayload) -> FundamentalSnapshot {
    let doc = raw.as_value();

    let pe = metric_at(doc, &["metric", "peTTM"], Unit::Ratio)
        .or_else(|| metric_at(doc, &["metric", "peBasicExclExtraTTM"], Unit::Ratio));

    let roic = metric_at(doc, &["metric", "roiTTM"], Unit::Percent).or_else(|| {
        lookup(doc, &["series", "annual", "roic"])
            .and_then(first_entry)
            .and_then(|point| number_at(point, &["v"]))
            .map(|v| Unit::Fraction.to_canonical(v))
    });

    FundamentalSnapshot::new(
        pe,
        metric_at(doc, &["metric", "totalDebt/totalEquityQuarterly"], Unit::Ratio),
        metric_at(doc, &["metric", "roeTTM"], Unit::Percent),
        roic,
        metric_at(doc, &["metric", "epsGrowthTTMYoy"], Unit::Percent),
    )
}
