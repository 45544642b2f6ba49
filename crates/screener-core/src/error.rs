//! Error types for screener operations.
//!
//! This module defines [`ScreenError`], which covers every way a provider call
//! or a configuration step can fail, plus the per-stage wrappers
//! [`ListError`] and [`FetchError`] the pipeline records for a run.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while listing symbols, fetching fundamentals, or
/// setting up a screening run.
#[derive(Error, Debug)]
pub enum ScreenError {
    /// Network-related errors (connection failures, broken bodies, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// A request exceeded its per-call timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Error parsing a provider response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The requested provider is unknown or not compiled in.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Authentication failed for a provider.
    #[error("Authentication failed for provider {0}")]
    AuthenticationFailed(String),

    /// The run configuration is incomplete or inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl ScreenError {
    /// Returns true if this error was caused by a per-call timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns true if this error should abort a run before it starts.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::ProviderNotConfigured(_)
                | Self::InvalidParameter(_)
        )
    }
}

/// Result type alias using [`ScreenError`].
pub type Result<T> = std::result::Result<T, ScreenError>;

/// Symbol listing for one exchange failed; the exchange contributes no symbols.
#[derive(Error, Debug)]
#[error("{provider}: listing {exchange} failed: {source}")]
pub struct ListError {
    /// Provider that was asked for the listing.
    pub provider: String,
    /// Exchange tag that was requested.
    pub exchange: String,
    /// Underlying cause.
    #[source]
    pub source: ScreenError,
}

/// Fetching the raw fundamentals of one symbol failed; the symbol is skipped.
#[derive(Error, Debug)]
#[error("{provider}: fetching {symbol} failed: {source}")]
pub struct FetchError {
    /// Provider the fetch was issued against.
    pub provider: String,
    /// Composite symbol that was requested.
    pub symbol: String,
    /// Underlying cause.
    #[source]
    pub source: ScreenError,
}

impl FetchError {
    /// Returns true if the fetch failed because a request timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        self.source.is_timeout()
    }
}

/// Outcome of listing one exchange.
pub type ListResult<T> = std::result::Result<T, ListError>;

/// Outcome of fetching one symbol.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
