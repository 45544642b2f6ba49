#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/screener/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching implementations for the fundamentals screener.
//!
//! This crate provides implementations of the [`ResponseCache`] trait from `screener-core`:
//!
//! - [`InMemoryCache`] - Process-lifetime in-memory cache (default for runs)
//! - [`NoopCache`] - No-op cache that doesn't store anything

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;

// Re-export the trait for convenience
pub use screener_core::ResponseCache;

// Re-export implementations
pub use memory::InMemoryCache;
pub use noop::NoopCache;
