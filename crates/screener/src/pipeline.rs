//! Ingestion pipeline: listing, fetching, screening and ranking one run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use screener_core::{
    FetchError, FetchResult, FundamentalsProvider, ListError, ListResult, RateLimiter, RawPayload,
    Region, ResponseCache, Result, ScreenError, ScreenResult, ScreeningCriteria, Symbol, rank,
};

use crate::normalizer::normalize;

/// Stage of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Created, nothing requested yet.
    Idle,
    /// Collecting symbol universes.
    Listing,
    /// Fetching and screening symbols.
    Fetching,
    /// Finished, report assembled.
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listing => "listing",
            Self::Fetching => "fetching",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Settings for one pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOptions {
    /// Exchange tags to list, in order.
    pub exchanges: Vec<String>,
    /// Maximum symbols kept per exchange.
    pub symbol_cap: usize,
    /// Report progress every this many checked symbols; zero disables it.
    pub progress_interval: usize,
    /// Maximum fetches in flight.
    pub max_concurrency: usize,
    /// Minimum spacing between network calls.
    pub min_interval: Duration,
    /// Screening thresholds.
    pub criteria: ScreeningCriteria,
}

impl PipelineOptions {
    /// Defaults from the provider's own profile and its exchanges for `region`.
    #[must_use]
    pub fn for_provider(provider: &dyn FundamentalsProvider, region: Region) -> Self {
        let profile = provider.profile();
        Self {
            exchanges: provider
                .exchanges(region)
                .iter()
                .map(|tag| (*tag).to_string())
                .collect(),
            symbol_cap: profile.symbol_cap,
            progress_interval: profile.progress_interval,
            max_concurrency: 1,
            min_interval: profile.min_interval,
            criteria: ScreeningCriteria::default(),
        }
    }

    /// Replace the exchange tags.
    #[must_use]
    pub fn with_exchanges<I, S>(mut self, exchanges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exchanges = exchanges.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-exchange symbol cap.
    #[must_use]
    pub const fn with_symbol_cap(mut self, cap: usize) -> Self {
        self.symbol_cap = cap;
        self
    }

    /// Set the progress interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the number of fetches allowed in flight.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the minimum interval between network calls.
    #[must_use]
    pub const fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the screening thresholds.
    #[must_use]
    pub const fn with_criteria(mut self, criteria: ScreeningCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Rejects settings under which a run cannot proceed.
    pub fn validate(&self) -> Result<()> {
        if self.exchanges.is_empty() {
            return Err(ScreenError::Configuration(
                "no exchanges to screen for this provider and region".to_string(),
            ));
        }
        if self.symbol_cap == 0 {
            return Err(ScreenError::Configuration(
                "symbol_cap must be at least 1".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ScreenError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunReport {
    /// Accepted symbols, ranked by ROIC.
    pub results: Vec<ScreenResult>,
    /// Symbols attempted, whatever their outcome.
    pub total_checked: usize,
    /// Symbols that passed the screen.
    pub total_accepted: usize,
    /// Exchanges whose listing failed.
    pub list_failures: Vec<ListError>,
    /// Symbols whose fetch failed.
    pub fetch_failures: Vec<FetchError>,
    /// True if the run was cancelled before the queue was drained.
    pub cancelled: bool,
    /// When the run left `Idle`.
    pub started_at: DateTime<Utc>,
    /// When the run reached `Done`.
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// One-line result summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.results.is_empty() {
            "No stocks matched all criteria.".to_string()
        } else {
            format!(
                "Found {} matching stocks out of {} scanned.",
                self.results.len(),
                self.total_checked
            )
        }
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Per-symbol outcome handed from the fetch stage to the accumulator.
enum Outcome {
    Screened(ScreenResult),
    Failed(FetchError),
}

/// State owned by a single run.
struct RunContext {
    state: RunState,
    queue: Vec<Symbol>,
    accepted: Vec<ScreenResult>,
    total_checked: usize,
    list_failures: Vec<ListError>,
    fetch_failures: Vec<FetchError>,
    cancelled: bool,
    started_at: DateTime<Utc>,
}

impl RunContext {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
            queue: Vec::new(),
            accepted: Vec::new(),
            total_checked: 0,
            list_failures: Vec::new(),
            fetch_failures: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    fn into_report(mut self) -> RunReport {
        self.transition(RunState::Done);
        let total_accepted = self.accepted.len();
        RunReport {
            results: rank(self.accepted),
            total_checked: self.total_checked,
            total_accepted,
            list_failures: self.list_failures,
            fetch_failures: self.fetch_failures,
            cancelled: self.cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Drives one provider through listing, fetching and screening.
///
/// The pipeline owns one rate limiter for its provider, so consecutive runs
/// on the same pipeline share request spacing. A fundamentals fetch takes one
/// slot per HTTP request the adapter issues for it. Cached responses skip both
/// the network and the limiter.
///
/// A composite symbol listed more than once is fetched once per run.
pub struct Pipeline {
    provider: Arc<dyn FundamentalsProvider>,
    cache: Arc<dyn ResponseCache>,
    limiter: RateLimiter,
    requests_per_fetch: u32,
    options: PipelineOptions,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline for `provider` backed by `cache`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn FundamentalsProvider>,
        cache: Arc<dyn ResponseCache>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            limiter: RateLimiter::new(options.min_interval),
            requests_per_fetch: provider.profile().requests_per_fetch,
            provider,
            cache,
            options,
        }
    }

    /// The settings this pipeline runs with.
    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs the screen without progress reporting.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport> {
        self.run_with_progress(cancel, |_| {}).await
    }

    /// Runs the screen, calling `progress` with the checked count every
    /// `progress_interval` symbols.
    ///
    /// Only invalid options produce an error, and they do so before any
    /// request is made. Listing and fetch failures are recorded in the report.
    pub async fn run_with_progress<F>(
        &self,
        cancel: &CancellationToken,
        mut progress: F,
    ) -> Result<RunReport>
    where
        F: FnMut(usize) + Send,
    {
        self.options.validate()?;

        let mut ctx = RunContext::new();
        let provider = self.provider.name();

        ctx.transition(RunState::Listing);
        let mut queued = HashSet::new();
        for exchange in &self.options.exchanges {
            if cancel.is_cancelled() {
                ctx.cancelled = true;
                break;
            }
            match self.listing(exchange).await {
                Ok(mut symbols) => {
                    symbols.truncate(self.options.symbol_cap);
                    debug!(provider, exchange = %exchange, count = symbols.len(), "Listed symbols");
                    for symbol in symbols {
                        if queued.insert(symbol.composite.clone()) {
                            ctx.queue.push(symbol);
                        } else {
                            debug!(provider, symbol = %symbol, "Already queued, skipping duplicate");
                        }
                    }
                }
                Err(e) => {
                    warn!(provider, exchange = %exchange, error = %e.source, "Listing failed, skipping exchange");
                    ctx.list_failures.push(e);
                }
            }
        }

        ctx.transition(RunState::Fetching);
        info!(provider, symbols = ctx.queue.len(), "Screening symbols");

        let queue = std::mem::take(&mut ctx.queue);
        let mut outcomes = stream::iter(queue)
            .map(|symbol| self.evaluate(symbol, cancel))
            .buffered(self.options.max_concurrency);

        while let Some(outcome) = outcomes.next().await {
            let Some(outcome) = outcome else {
                ctx.cancelled = true;
                break;
            };

            ctx.total_checked += 1;
            match outcome {
                Outcome::Screened(result) if result.passed => ctx.accepted.push(result),
                Outcome::Screened(_) => {}
                Outcome::Failed(e) => {
                    warn!(provider, symbol = %e.symbol, error = %e.source, "Fetch failed, skipping symbol");
                    ctx.fetch_failures.push(e);
                }
            }

            let interval = self.options.progress_interval;
            if interval > 0 && ctx.total_checked % interval == 0 {
                info!(provider, checked = ctx.total_checked, accepted = ctx.accepted.len(), "Progress");
                progress(ctx.total_checked);
            }
        }

        let report = ctx.into_report();
        info!(
            provider,
            checked = report.total_checked,
            accepted = report.total_accepted,
            list_failures = report.list_failures.len(),
            fetch_failures = report.fetch_failures.len(),
            cancelled = report.cancelled,
            "Run complete"
        );
        Ok(report)
    }

    /// Symbols of one exchange, from cache when possible.
    async fn listing(&self, exchange: &str) -> ListResult<Vec<Symbol>> {
        let provider = self.provider.name();

        match self.cache.get_symbols(provider, exchange).await {
            Ok(Some(symbols)) => return Ok(symbols),
            Ok(None) => {}
            Err(e) => warn!(provider, exchange, error = %e, "Cache read failed"),
        }

        self.limiter.acquire().await;
        let symbols = self
            .provider
            .list_symbols(exchange)
            .await
            .map_err(|source| ListError {
                provider: provider.to_string(),
                exchange: exchange.to_string(),
                source,
            })?;

        if let Err(e) = self.cache.put_symbols(provider, exchange, &symbols).await {
            warn!(provider, exchange, error = %e, "Failed to cache listing");
        }
        Ok(symbols)
    }

    /// Raw fundamentals of one symbol, from cache when possible.
    ///
    /// Returns `None` if the run is cancelled while waiting for a slot.
    async fn fundamentals(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Option<FetchResult<RawPayload>> {
        let provider = self.provider.name();
        let composite = symbol.as_str();

        match self.cache.get_fundamentals(provider, composite).await {
            Ok(Some(raw)) => return Some(Ok(raw)),
            Ok(None) => {}
            Err(e) => warn!(provider, symbol = %composite, error = %e, "Cache read failed"),
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            () = self.limiter.acquire_n(self.requests_per_fetch) => {}
        }

        debug!(provider, symbol = %composite, "Fetching fundamentals");
        let result = self.provider.fetch_fundamentals(composite).await;
        Some(match result {
            Ok(raw) => {
                if let Err(e) = self.cache.put_fundamentals(provider, composite, &raw).await {
                    warn!(provider, symbol = %composite, error = %e, "Failed to cache fundamentals");
                }
                Ok(raw)
            }
            Err(source) => Err(FetchError {
                provider: provider.to_string(),
                symbol: composite.to_string(),
                source,
            }),
        })
    }

    /// Fetch, normalize and screen one symbol; `None` once cancelled.
    async fn evaluate(&self, symbol: Symbol, cancel: &CancellationToken) -> Option<Outcome> {
        if cancel.is_cancelled() {
            return None;
        }

        let raw = match self.fundamentals(&symbol, cancel).await? {
            Ok(raw) => raw,
            Err(e) => return Some(Outcome::Failed(e)),
        };

        let snapshot = normalize(self.provider.id(), &raw);
        let passed = self.options.criteria.passes(&snapshot);
        if !passed {
            debug!(symbol = %symbol, missing = ?snapshot.missing_fields(), "Rejected");
        }
        Some(Outcome::Screened(ScreenResult::new(symbol, snapshot, passed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(accepted: usize, checked: usize) -> RunReport {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RunReport {
            results: (0..accepted)
                .map(|i| {
                    ScreenResult::new(Symbol::new(format!("S{i}"), "US"), Default::default(), true)
                })
                .collect(),
            total_checked: checked,
            total_accepted: accepted,
            list_failures: Vec::new(),
            fetch_failures: Vec::new(),
            cancelled: false,
            started_at: at,
            finished_at: at + chrono::Duration::seconds(5),
        }
    }

    #[test]
    fn test_summary_lines() {
        assert_eq!(
            report(2, 40).summary(),
            "Found 2 matching stocks out of 40 scanned."
        );
        assert_eq!(report(0, 40).summary(), "No stocks matched all criteria.");
        assert_eq!(report(0, 40).elapsed(), chrono::Duration::seconds(5));
    }

    #[test]
    fn test_options_validation() {
        let options = PipelineOptions {
            exchanges: vec!["US".to_string()],
            symbol_cap: 10,
            progress_interval: 0,
            max_concurrency: 1,
            min_interval: Duration::ZERO,
            criteria: ScreeningCriteria::default(),
        };
        assert!(options.validate().is_ok());

        let empty = options.clone().with_exchanges(Vec::<String>::new());
        assert!(empty.validate().unwrap_err().is_configuration());
        assert!(
            options
                .clone()
                .with_symbol_cap(0)
                .validate()
                .unwrap_err()
                .is_configuration()
        );
        assert!(
            options
                .with_max_concurrency(0)
                .validate()
                .unwrap_err()
                .is_configuration()
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(RunState::Listing.to_string(), "listing");
        assert_eq!(RunState::Done.to_string(), "done");
    }
}
