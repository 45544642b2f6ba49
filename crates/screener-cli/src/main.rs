//! Command-line front end for the fundamentals screener.

use std::path::PathBuf;

use clap::Parser;
use screener::{
    FundamentalSnapshot, ProviderId, ProviderRegistry, Region, RunReport, ScreenerConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Screen a region's stocks against five value-investing thresholds.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SCREENER_CONFIG")]
    config: Option<PathBuf>,

    /// Data provider: eodhd, fmp, finnhub or alphavantage
    #[arg(short, long)]
    provider: Option<ProviderId>,

    /// Region: us, europe or asia
    #[arg(short, long)]
    region: Option<Region>,

    /// Exchange tag to screen instead of the region's defaults (repeatable)
    #[arg(short = 'x', long = "exchange")]
    exchanges: Vec<String>,

    /// Maximum symbols per exchange
    #[arg(long)]
    symbol_cap: Option<usize>,

    /// Maximum fetches in flight
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Maximum P/E (exclusive)
    #[arg(long)]
    pe_max: Option<f64>,

    /// Maximum Debt/Equity (exclusive)
    #[arg(long)]
    debt_equity_max: Option<f64>,

    /// Minimum ROE in percent (inclusive)
    #[arg(long)]
    roe_min: Option<f64>,

    /// Minimum ROIC in percent (exclusive)
    #[arg(long)]
    roic_min: Option<f64>,

    /// Minimum EPS growth in percent (exclusive)
    #[arg(long)]
    eps_growth_min: Option<f64>,
}

impl Cli {
    /// Flags override the file and the environment.
    fn apply(&self, config: &mut ScreenerConfig) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(region) = self.region {
            config.region = region;
        }
        if !self.exchanges.is_empty() {
            config.exchanges = Some(self.exchanges.clone());
        }
        if let Some(cap) = self.symbol_cap {
            config.symbol_cap = Some(cap);
        }
        if let Some(max) = self.max_concurrency {
            config.max_concurrency = max;
        }

        let criteria = &mut config.criteria;
        let overrides = [
            (self.pe_max, &mut criteria.pe_max),
            (self.debt_equity_max, &mut criteria.debt_equity_max),
            (self.roe_min, &mut criteria.roe_min),
            (self.roic_min, &mut criteria.roic_min),
            (self.eps_growth_min, &mut criteria.eps_growth_min),
        ];
        for (flag, threshold) in overrides {
            if let Some(value) = flag {
                *threshold = value;
            }
        }
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn print_row(code: &str, name: &str, s: &FundamentalSnapshot) {
    println!(
        "{code:<12} {name:<32} {:>8} {:>8} {:>8} {:>8} {:>10}",
        cell(s.pe),
        cell(s.debt_to_equity),
        cell(s.roe),
        cell(s.roic),
        cell(s.eps_growth_yoy),
    );
}

fn print_report(report: &RunReport) {
    if !report.results.is_empty() {
        println!(
            "{:<12} {:<32} {:>8} {:>8} {:>8} {:>8} {:>10}",
            "Symbol", "Name", "P/E", "D/E", "ROE %", "ROIC %", "EPS gr. %"
        );
        for row in &report.results {
            let name: String = row.display_name.chars().take(32).collect();
            print_row(&row.symbol.code, &name, &row.snapshot);
        }
        println!();
    }

    println!("{}", report.summary());
    if !report.list_failures.is_empty() || !report.fetch_failures.is_empty() {
        println!(
            "{} exchange listings and {} symbols could not be fetched.",
            report.list_failures.len(),
            report.fetch_failures.len()
        );
    }
    if report.cancelled {
        println!("Run interrupted; results are partial.");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ScreenerConfig::from_file(path)?,
        None => ScreenerConfig::default(),
    };
    config.apply_env()?;
    cli.apply(&mut config);
    config.validate()?;

    let registry = ProviderRegistry::from_config(&config)?;
    let pipeline = registry.pipeline_for(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the symbols in flight");
            on_interrupt.cancel();
        }
    });

    println!(
        "Screening {} ({}) via {}",
        config.region,
        pipeline.options().exchanges.join(", "),
        config.provider
    );

    let report = pipeline
        .run_with_progress(&cancel, |checked| eprintln!("Checked {checked} stocks..."))
        .await?;

    print_report(&report);
    Ok(())
}
