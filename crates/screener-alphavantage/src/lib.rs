#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/screener/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Alpha Vantage data provider.
//!
//! Every call goes to the single `query` endpoint and is selected by its
//! `function` parameter. Alpha Vantage reports throttling and unknown symbols
//! in the response body with a 200 status, so bodies are classified before
//! they are returned.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use screener_core::normalize::{Unit, lookup, metric_at, number_at, ratio};
use screener_core::{
    DataProvider, FundamentalSnapshot, FundamentalsProvider, ProviderId, ProviderProfile,
    RawPayload, Region, Result, ScreenError, Symbol,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Premium tier allows 75 calls per minute; a fetch is two calls.
const PROFILE: ProviderProfile =
    ProviderProfile::new(Duration::from_millis(800), 100, 20).with_requests_per_fetch(2);

/// Exchange names as they appear in the `LISTING_STATUS` CSV.
const US_EXCHANGES: &[&str] = &["NASDAQ", "NYSE", "NYSE ARCA", "NYSE MKT", "BATS"];

/// Columns the listing parser relies on.
const REQUIRED_COLUMNS: [&str; 4] = ["symbol", "name", "exchange", "assetType"];

/// Row of the `LISTING_STATUS` CSV.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingRow {
    symbol: String,
    name: String,
    exchange: String,
    asset_type: String,
}

/// Alpha Vantage data provider.
#[derive(Clone)]
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for AlphaVantageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlphaVantageProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key)
    }

    /// Create a new Alpha Vantage provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the provider at a different query endpoint.
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

    /// Runs one `function` call and returns the response text.
    async fn query(&self, function: &str, params: &[(&str, &str)]) -> Result<String> {
        debug!(function, ?params, "Alpha Vantage request");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("function", function), ("apikey", self.api_key.as_str())])
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(self.rate_limited());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScreenError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(|e| self.transport_error(e))
    }

    /// Runs a JSON `function` call and classifies in-band errors.
    async fn query_json(&self, function: &str, symbol: &str) -> Result<Map<String, Value>> {
        let text = self.query(function, &[("symbol", symbol)]).await?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| ScreenError::Parse(format!("{e}: {text}")))?;
        let Value::Object(map) = body else {
            return Err(ScreenError::Parse(format!(
                "{function} returned a non-object body for {symbol}"
            )));
        };
        self.check_in_band(&map, symbol)?;
        if map.is_empty() {
            return Err(ScreenError::SymbolNotFound(symbol.to_string()));
        }
        Ok(map)
    }

    fn check_in_band(&self, body: &Map<String, Value>, symbol: &str) -> Result<()> {
        if let Some(note) = body.get("Note").or_else(|| body.get("Information")) {
            warn!(%note, "Alpha Vantage throttled the request");
            return Err(self.rate_limited());
        }
        if body.contains_key("Error Message") {
            return Err(ScreenError::SymbolNotFound(symbol.to_string()));
        }
        Ok(())
    }

    fn rate_limited(&self) -> ScreenError {
        ScreenError::RateLimited {
            provider: "Alpha Vantage".to_string(),
            retry_after: None,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ScreenError {
        if err.is_timeout() {
            ScreenError::Timeout(self.timeout)
        } else {
            ScreenError::Network(err.to_string())
        }
    }
}

/// Parses the `LISTING_STATUS` CSV, keeping common stock on `exchange_tag`.
fn parse_listing(text: &str, exchange_tag: &str) -> Result<Vec<Symbol>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ScreenError::Parse(format!("listing header: {e}")))?;
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(ScreenError::Parse(format!(
            "listing is missing the {missing} column"
        )));
    }

    let mut symbols = Vec::new();
    for row in reader.deserialize::<ListingRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                debug!(exchange = exchange_tag, error = %e, "Skipping malformed listing row");
                continue;
            }
        };
        if row.exchange == exchange_tag && row.asset_type == "Stock" && !row.symbol.is_empty() {
            symbols.push(Symbol::new(row.symbol, exchange_tag).with_display_name(row.name));
        }
    }
    Ok(symbols)
}

impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "Alpha Vantage"
    }

    fn description(&self) -> &str {
        "Alpha Vantage - Company overviews and financial statements"
    }
}

#[async_trait]
impl FundamentalsProvider for AlphaVantageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::AlphaVantage
    }

    fn profile(&self) -> ProviderProfile {
        PROFILE
    }

    /// Only US exchanges are covered by `LISTING_STATUS`.
    fn exchanges(&self, region: Region) -> &'static [&'static str] {
        match region {
            Region::Us => US_EXCHANGES,
            Region::Europe | Region::Asia => &[],
        }
    }

    async fn list_symbols(&self, exchange_tag: &str) -> Result<Vec<Symbol>> {
        let text = self
            .query("LISTING_STATUS", &[("state", "active")])
            .await?;

        // Throttled listing calls answer with JSON instead of CSV.
        if text.trim_start().starts_with('{') {
            let body: Map<String, Value> = serde_json::from_str(&text)
                .map_err(|e| ScreenError::Parse(format!("{e}: {text}")))?;
            self.check_in_band(&body, exchange_tag)?;
            return Err(ScreenError::Parse(format!(
                "expected a CSV listing for {exchange_tag}"
            )));
        }

        parse_listing(&text, exchange_tag)
    }

    async fn fetch_fundamentals(&self, composite_symbol: &str) -> Result<RawPayload> {
        let overview = self.query_json("OVERVIEW", composite_symbol).await?;
        let balance_sheet = self.query_json("BALANCE_SHEET", composite_symbol).await?;

        Ok(RawPayload::new(json!({
            "overview": overview,
            "balanceSheet": balance_sheet,
        })))
    }
}

/// Maps an assembled Alpha Vantage payload onto the canonical snapshot.
///
/// ROIC is not published; `ReturnOnAssetsTTM` is used in its place. Alpha
/// Vantage sends numbers as strings and writes `"None"` for missing values.
#[must_use]
pub fn normalize(raw: &RawPayload) -> FundamentalSnapshot {
    let doc = raw.as_value();
    let latest_report = lookup(doc, &["balanceSheet", "quarterlyReports"])
        .and_then(Value::as_array)
        .and_then(|reports| reports.first());
    let report_value = |field: &str| latest_report.and_then(|r| number_at(r, &[field]));

    FundamentalSnapshot::new(
        metric_at(doc, &["overview", "PERatio"], Unit::Ratio),
        ratio(
            report_value("shortLongTermDebtTotal"),
            report_value("totalShareholderEquity"),
        ),
        metric_at(doc, &["overview", "ReturnOnEquityTTM"], Unit::Fraction),
        metric_at(doc, &["overview", "ReturnOnAssetsTTM"], Unit::Fraction),
        metric_at(doc, &["overview", "QuarterlyEarningsGrowthYOY"], Unit::Fraction),
    )
}
