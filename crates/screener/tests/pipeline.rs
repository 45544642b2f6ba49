//! Pipeline behavior against an in-process provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use screener::{
    DataProvider, FundamentalsProvider, InMemoryCache, Pipeline, PipelineOptions, ProviderId,
    ProviderProfile, ProviderRegistry, RawPayload, Region, ResponseCache, Result, ScreenError,
    ScreeningCriteria, Symbol,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Provider serving canned Finnhub-shaped payloads.
#[derive(Debug, Default)]
struct StubProvider {
    /// Exchange tag to listing; `None` makes the listing fail.
    listings: HashMap<String, Option<Vec<Symbol>>>,
    /// Composite symbol to payload; absent symbols time out.
    payloads: HashMap<String, Value>,
    /// HTTP requests each fetch stands for; zero means one.
    requests_per_fetch: u32,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
    fetched_at: Mutex<Vec<tokio::time::Instant>>,
}

impl StubProvider {
    fn with_listing(mut self, exchange: &str, codes: &[&str]) -> Self {
        let symbols = codes.iter().map(|c| Symbol::new(*c, exchange)).collect();
        self.listings.insert(exchange.to_string(), Some(symbols));
        self
    }

    fn with_broken_listing(mut self, exchange: &str) -> Self {
        self.listings.insert(exchange.to_string(), None);
        self
    }

    fn with_company(mut self, code: &str, pe: f64, roic: f64) -> Self {
        self.payloads.insert(
            code.to_string(),
            json!({
                "metric": {
                    "peTTM": pe,
                    "totalDebt/totalEquityQuarterly": 0.2,
                    "roeTTM": 20.0,
                    "roiTTM": roic,
                    "epsGrowthTTMYoy": 10.0
                }
            }),
        );
        self
    }

    fn with_requests_per_fetch(mut self, requests: u32) -> Self {
        self.requests_per_fetch = requests;
        self
    }

    fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl DataProvider for StubProvider {
    fn name(&self) -> &str {
        "Stub"
    }

    fn description(&self) -> &str {
        "Canned Finnhub-shaped responses"
    }
}

#[async_trait]
impl FundamentalsProvider for StubProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
    }

    fn profile(&self) -> ProviderProfile {
        ProviderProfile::new(Duration::ZERO, 100, 10)
            .with_requests_per_fetch(self.requests_per_fetch.max(1))
    }

    fn exchanges(&self, _region: Region) -> &'static [&'static str] {
        &["US"]
    }

    async fn list_symbols(&self, exchange_tag: &str) -> Result<Vec<Symbol>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match self.listings.get(exchange_tag) {
            Some(Some(symbols)) => Ok(symbols.clone()),
            _ => Err(ScreenError::Parse(format!(
                "expected a symbol list for {exchange_tag}"
            ))),
        }
    }

    async fn fetch_fundamentals(&self, composite_symbol: &str) -> Result<RawPayload> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetched
            .lock()
            .unwrap()
            .push(composite_symbol.to_string());
        self.fetched_at
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        // Give other in-flight fetches a chance to run
        tokio::task::yield_now().await;
        self.payloads
            .get(composite_symbol)
            .cloned()
            .map(RawPayload::new)
            .ok_or(ScreenError::Timeout(Duration::from_secs(30)))
    }
}

fn options(exchanges: &[&str]) -> PipelineOptions {
    PipelineOptions {
        exchanges: exchanges.iter().map(|e| (*e).to_string()).collect(),
        symbol_cap: 100,
        progress_interval: 0,
        max_concurrency: 1,
        min_interval: Duration::ZERO,
        criteria: ScreeningCriteria::default(),
    }
}

fn pipeline(provider: &Arc<StubProvider>, options: PipelineOptions) -> Pipeline {
    Pipeline::new(provider.clone(), Arc::new(InMemoryCache::new()), options)
}

fn codes(report: &screener::RunReport) -> Vec<&str> {
    report.results.iter().map(|r| r.symbol.code.as_str()).collect()
}

#[tokio::test]
async fn test_end_to_end_screen() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "B"])
            .with_company("A", 15.0, 14.0)
            .with_company("B", 25.0, 14.0),
    );

    let report = pipeline(&provider, options(&["US"]))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(codes(&report), vec!["A"]);
    assert_eq!(report.total_checked, 2);
    assert_eq!(report.total_accepted, 1);
    assert!(report.results[0].passed);
    assert!(!report.cancelled);
    assert!(report.finished_at >= report.started_at);
    assert_eq!(report.summary(), "Found 1 matching stocks out of 2 scanned.");
}

#[tokio::test]
async fn test_failed_fetch_does_not_stop_the_run() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "BROKEN", "C"])
            .with_company("A", 10.0, 13.0)
            .with_company("C", 10.0, 40.0),
    );

    let report = pipeline(&provider, options(&["US"]))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_checked, 3);
    assert_eq!(report.total_accepted, 2);
    assert_eq!(report.fetch_failures.len(), 1);
    assert_eq!(report.fetch_failures[0].symbol, "BROKEN");
    assert!(report.fetch_failures[0].is_timeout());
    // Ranked by ROIC, not fetch order
    assert_eq!(codes(&report), vec!["C", "A"]);
    assert_eq!(
        *provider.fetched.lock().unwrap(),
        vec!["A".to_string(), "BROKEN".to_string(), "C".to_string()]
    );
}

#[tokio::test]
async fn test_failed_listing_degrades_to_empty() {
    let provider = Arc::new(
        StubProvider::default()
            .with_broken_listing("XETRA")
            .with_listing("LSE", &["VOD"])
            .with_company("VOD", 12.0, 15.0),
    );

    let report = pipeline(&provider, options(&["XETRA", "LSE"]))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.list_failures.len(), 1);
    assert_eq!(report.list_failures[0].exchange, "XETRA");
    assert!(matches!(
        report.list_failures[0].source,
        ScreenError::Parse(_)
    ));
    assert_eq!(report.total_checked, 1);
    assert_eq!(codes(&report), vec!["VOD"]);
}

#[tokio::test]
async fn test_every_listing_failing_reports_no_matches() {
    let provider = Arc::new(StubProvider::default().with_broken_listing("US"));

    let report = pipeline(&provider, options(&["US"]))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_checked, 0);
    assert_eq!(provider.fetches(), 0);
    assert_eq!(report.summary(), "No stocks matched all criteria.");
}

#[tokio::test]
async fn test_cached_responses_are_reused() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "B"])
            .with_company("A", 15.0, 14.0)
            .with_company("B", 15.0, 14.0),
    );
    let pipeline = pipeline(&provider, options(&["US"]));
    let cancel = CancellationToken::new();

    let first = pipeline.run(&cancel).await.unwrap();
    let second = pipeline.run(&cancel).await.unwrap();

    assert_eq!(provider.lists(), 1);
    assert_eq!(provider.fetches(), 2);
    assert_eq!(first.total_checked, second.total_checked);
    assert_eq!(codes(&first), codes(&second));
}

#[tokio::test]
async fn test_symbol_cap_truncates_each_exchange() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("NASDAQ", &["A", "B", "C", "D"])
            .with_listing("NYSE", &["E", "F", "G"]),
    );

    let report = pipeline(&provider, options(&["NASDAQ", "NYSE"]).with_symbol_cap(2))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_checked, 4);
    assert_eq!(
        *provider.fetched.lock().unwrap(),
        vec!["A", "B", "E", "F"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_progress_reports_checked_count() {
    let provider = Arc::new(
        StubProvider::default().with_listing("US", &["A", "B", "C", "D", "E"]),
    );
    let mut seen = Vec::new();

    let report = pipeline(&provider, options(&["US"]).with_progress_interval(2))
        .run_with_progress(&CancellationToken::new(), |checked| seen.push(checked))
        .await
        .unwrap();

    assert_eq!(report.total_checked, 5);
    assert_eq!(seen, vec![2, 4]);
}

#[tokio::test]
async fn test_pre_cancelled_run_checks_nothing() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A"])
            .with_company("A", 15.0, 14.0),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = pipeline(&provider, options(&["US"]))
        .run(&cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.total_checked, 0);
    assert_eq!(provider.lists(), 0);
    assert_eq!(provider.fetches(), 0);
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_partial_results() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "B", "C", "D"])
            .with_company("A", 15.0, 14.0)
            .with_company("B", 15.0, 20.0)
            .with_company("C", 15.0, 30.0),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let report = pipeline(&provider, options(&["US"]).with_progress_interval(2))
        .run_with_progress(&cancel, move |_| trigger.cancel())
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.total_checked, 2);
    assert_eq!(codes(&report), vec!["B", "A"]);
    assert_eq!(provider.fetches(), 2);
}

#[tokio::test]
async fn test_concurrent_fetches_preserve_queue_order() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "B", "C", "D"])
            .with_company("A", 15.0, 14.0)
            .with_company("B", 15.0, 14.0)
            .with_company("C", 15.0, 14.0)
            .with_company("D", 15.0, 14.0),
    );

    let report = pipeline(&provider, options(&["US"]).with_max_concurrency(3))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_checked, 4);
    // Equal ROIC keeps fetch order
    assert_eq!(codes(&report), vec!["A", "B", "C", "D"]);
}

#[tokio::test(start_paused = true)]
async fn test_network_calls_are_spaced_but_cache_hits_are_not() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "B", "C"])
            .with_company("A", 15.0, 14.0)
            .with_company("B", 15.0, 14.0)
            .with_company("C", 15.0, 14.0),
    );
    let pipeline = pipeline(
        &provider,
        options(&["US"]).with_min_interval(Duration::from_secs(1)),
    );
    let cancel = CancellationToken::new();

    let start = tokio::time::Instant::now();
    pipeline.run(&cancel).await.unwrap();
    // One listing and three fetches: three intervals after the first call
    assert!(start.elapsed() >= Duration::from_secs(3));

    let start = tokio::time::Instant::now();
    pipeline.run(&cancel).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_multi_request_fetches_take_one_slot_per_request() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "B"])
            .with_company("A", 15.0, 14.0)
            .with_company("B", 15.0, 14.0)
            .with_requests_per_fetch(3),
    );
    let pipeline = pipeline(
        &provider,
        options(&["US"]).with_min_interval(Duration::from_millis(500)),
    );

    let start = tokio::time::Instant::now();
    let report = pipeline.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.total_checked, 2);
    // One listing plus two fetches of three requests: six intervals
    assert!(start.elapsed() >= Duration::from_millis(3000));
    let times = provider.fetched_at.lock().unwrap();
    assert_eq!(times.len(), 2);
    assert!(times[1] - times[0] >= Duration::from_millis(1400));
}

#[tokio::test]
async fn test_duplicate_symbols_are_fetched_once() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A", "B", "A"])
            .with_company("A", 15.0, 14.0)
            .with_company("B", 15.0, 14.0),
    );

    let report = pipeline(
        &provider,
        options(&["US", "US"]).with_max_concurrency(2),
    )
    .run(&CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(provider.fetches(), 2);
    assert_eq!(
        *provider.fetched.lock().unwrap(),
        vec!["A".to_string(), "B".to_string()]
    );
    assert_eq!(report.total_checked, 2);
    assert_eq!(codes(&report), vec!["A", "B"]);
}

#[tokio::test]
async fn test_invalid_options_fail_before_listing() {
    let provider = Arc::new(StubProvider::default().with_listing("US", &["A"]));

    let err = pipeline(&provider, options(&[]))
        .run(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());

    let err = pipeline(&provider, options(&["US"]).with_max_concurrency(0))
        .run(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(provider.lists(), 0);
}

#[tokio::test]
async fn test_registry_pipelines_share_the_cache() {
    let provider = Arc::new(
        StubProvider::default()
            .with_listing("US", &["A"])
            .with_company("A", 15.0, 14.0),
    );
    let mut registry = ProviderRegistry::new();
    registry.register(provider.clone());

    let options = PipelineOptions::for_provider(provider.as_ref(), Region::Us)
        .with_min_interval(Duration::ZERO);
    let cancel = CancellationToken::new();

    registry
        .pipeline(ProviderId::Finnhub, options.clone())
        .unwrap()
        .run(&cancel)
        .await
        .unwrap();
    let report = registry
        .pipeline(ProviderId::Finnhub, options)
        .unwrap()
        .run(&cancel)
        .await
        .unwrap();

    assert_eq!(report.total_accepted, 1);
    assert_eq!(provider.fetches(), 1);
    assert_eq!(registry.cache().len().await, 2);
}
