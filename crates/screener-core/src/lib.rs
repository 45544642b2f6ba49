#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/screener/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the fundamentals screener.
//!
//! This crate provides the foundational abstractions shared by every provider
//! adapter and by the ingestion pipeline:
//!
//! - [`DataProvider`](provider::DataProvider) - Base trait for all providers
//! - [`FundamentalsProvider`](provider::FundamentalsProvider) - Symbol listing and raw fundamentals
//! - [`FundamentalSnapshot`](types::FundamentalSnapshot) - Canonical normalized record
//! - [`ScreeningCriteria`](screen::ScreeningCriteria) - The five screening thresholds
//! - [`ResponseCache`](cache::ResponseCache) - Caching abstraction for raw responses
//! - [`RateLimiter`](rate_limit::RateLimiter) - Minimum-interval request spacing

/// Cache trait for raw provider responses.
pub mod cache;
/// Error types for screener operations.
pub mod error;
/// Field extraction and unit conversion helpers shared by the normalizers.
pub mod normalize;
/// Provider traits and per-provider policy.
pub mod provider;
/// Fixed-interval rate limiting.
pub mod rate_limit;
/// Ordering of accepted results.
pub mod rank;
/// Regions and provider identifiers.
pub mod region;
/// Screening thresholds and the pass/fail predicate.
pub mod screen;
/// Core data types (Symbol, FundamentalSnapshot, ScreenResult, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::ResponseCache;
pub use error::{FetchError, FetchResult, ListError, ListResult, Result, ScreenError};
pub use normalize::Unit;
pub use provider::{DataProvider, FundamentalsProvider, ProviderProfile};
pub use rank::rank;
pub use rate_limit::RateLimiter;
pub use region::{ProviderId, Region};
pub use screen::{ScreeningCriteria, passes};
pub use types::{FundamentalSnapshot, RawPayload, ScreenResult, Symbol};
