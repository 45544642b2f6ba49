#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/screener/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Unified screening interface.
//!
//! This crate re-exports the core types and the provider adapters, and adds
//! the pieces that tie them together: a [`ProviderRegistry`], the
//! [`normalize`] dispatch, the [`Pipeline`] that drives a run and the
//! [`ScreenerConfig`] it is configured from.
//!
//! # Example
//!
//! ```rust,ignore
//! use screener::{ProviderRegistry, ScreenerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> screener::Result<()> {
//!     let config = ScreenerConfig::from_toml_str(r#"
//!         provider = "eodhd"
//!         region = "europe"
//!         api_key = "demo"
//!     "#)?;
//!     config.validate()?;
//!
//!     let registry = ProviderRegistry::from_config(&config)?;
//!     let pipeline = registry.pipeline_for(&config)?;
//!     let report = pipeline.run(&CancellationToken::new()).await?;
//!
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use screener_core::*;

// Cache implementations
pub use screener_cache::{InMemoryCache, NoopCache};

// Providers
#[cfg(feature = "alphavantage")]
pub use screener_alphavantage::AlphaVantageProvider;
#[cfg(feature = "eodhd")]
pub use screener_eodhd::EodhdProvider;
#[cfg(feature = "finnhub")]
pub use screener_finnhub::FinnhubProvider;
#[cfg(feature = "fmp")]
pub use screener_fmp::FmpProvider;

mod config;
pub use config::ScreenerConfig;

mod normalizer;
pub use normalizer::normalize;

mod pipeline;
pub use pipeline::{Pipeline, PipelineOptions, RunReport, RunState};

mod registry;
pub use registry::ProviderRegistry;
