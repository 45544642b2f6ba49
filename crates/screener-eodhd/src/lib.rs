#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/screener/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! EOD Historical Data (EODHD) data provider.
//!
//! This crate implements the screener-core traits for the
//! [EODHD](https://eodhd.com/) API: exchange symbol lists and the
//! single-document fundamentals endpoint.
//!
//! # Example
//!
//! ```no_run
//! use screener_core::FundamentalsProvider;
//! use screener_eodhd::{EodhdProvider, normalize};
//!
//! # async fn example() -> screener_core::Result<()> {
//! let provider = EodhdProvider::new("your_api_token");
//! let symbols = provider.list_symbols("LSE").await?;
//! if let Some(first) = symbols.first() {
//!     let raw = provider.fetch_fundamentals(first.as_str()).await?;
//!     println!("{:?}", normalize(&raw));
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use screener_core::normalize::{Unit, first_entry, lookup, metric_at, number, ratio};
use screener_core::{
    DataProvider, FundamentalSnapshot, FundamentalsProvider, ProviderId, ProviderProfile,
    RawPayload, Region, Result, ScreenError, Symbol,
};
use serde_json::Value;
use tracing::debug;

/// EODHD API base URL.
const EODHD_BASE_URL: &str = "https://eodhistoricaldata.com/api";

/// Default per-call timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One request per second, at most 100 symbols per exchange.
const PROFILE: ProviderProfile = ProviderProfile::new(Duration::from_secs(1), 100, 20);

const US_EXCHANGES: &[&str] = &["US"];
const EUROPE_EXCHANGES: &[&str] = &["LSE", "XETRA", "SW", "PA", "MI"];
const ASIA_EXCHANGES: &[&str] = &["TSE", "HK", "KO"];

/// EOD Historical Data provider.
#[derive(Clone)]
pub struct EodhdProvider {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for EodhdProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EodhdProvider")
            .field("api_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl EodhdProvider {
    /// Create a new EODHD provider with the given API token.
    #[must_use]
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_token)
    }

    /// Create a new EODHD provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, api_token: impl Into<String>) -> Self {
        Self {
            client,
            api_token: api_token.into(),
            base_url: EODHD_BASE_URL.to_string(),
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

    /// GET `path` with the token and `params`, returning the JSON body.
    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url);
        debug!(path, "EODHD request");

        let response = self
            .client
            .get(&url)
            .query(&[("api_token", self.api_token.as_str()), ("fmt", "json")])
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScreenError::Timeout(self.timeout)
                } else {
                    ScreenError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::PAYMENT_REQUIRED
        {
            return Err(ScreenError::RateLimited {
                provider: "EODHD".to_string(),
                retry_after: None,
            });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ScreenError::AuthenticationFailed("EODHD".to_string()));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScreenError::SymbolNotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScreenError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ScreenError::Network(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ScreenError::Parse(format!("{e}: {text}")))
    }
}

impl DataProvider for EodhdProvider {
    fn name(&self) -> &str {
        "EODHD"
    }

    fn description(&self) -> &str {
        "EOD Historical Data - Global fundamentals and end-of-day prices"
    }
}

#[async_trait]
impl FundamentalsProvider for EodhdProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Eodhd
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
        let body = self
            .get_json(
                &format!("exchange-symbol-list/{exchange_tag}"),
                &[("type", "Common Stock")],
            )
            .await?;

        let Value::Array(rows) = body else {
            return Err(ScreenError::Parse(format!(
                "expected a symbol list for {exchange_tag}"
            )));
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                let code = row.get("Code").and_then(Value::as_str)?.trim();
                if code.is_empty() {
                    return None;
                }
                let name = row.get("Name").and_then(Value::as_str).unwrap_or_default();
                Some(Symbol::dotted(code, exchange_tag).with_display_name(name))
            })
            .collect())
    }

    async fn fetch_fundamentals(&self, composite_symbol: &str) -> Result<RawPayload> {
        let body = self
            .get_json(&format!("fundamentals/{composite_symbol}"), &[])
            .await?;

        match &body {
            Value::Object(map) if !map.is_empty() => Ok(RawPayload::new(body)),
            _ => Err(ScreenError::SymbolNotFound(composite_symbol.to_string())),
        }
    }
}

/// Maps an EODHD fundamentals document onto the canonical snapshot.
///
/// Debt/Equity is computed from the newest entries of the quarterly
/// `totalDebt` and `totalEquity` series.
#[must_use]
pub fn normalize(raw: &RawPayload) -> FundamentalSnapshot {
    let doc = raw.as_value();
    let balance_sheet = lookup(doc, &["Financials", "quarterly", "balance_sheet"]);
    let latest = |series: &str| {
        balance_sheet
            .and_then(|bs| bs.get(series))
            .and_then(first_entry)
            .and_then(number)
    };

    FundamentalSnapshot::new(
        metric_at(doc, &["Highlights", "PERatio"], Unit::Ratio),
        ratio(latest("totalDebt"), latest("totalEquity")),
        metric_at(doc, &["Highlights", "ReturnOnEquityTTM"], Unit::Fraction),
        metric_at(doc, &["Highlights", "ReturnOnInvestedCapitalTTM"], Unit::Fraction),
        metric_at(doc, &["Growth", "EarningsPerShare"], Unit::Fraction),
    )
}
