//! Dispatch from a provider tag to that provider's normalizer.

use screener_core::{FundamentalSnapshot, ProviderId, RawPayload};
use tracing::warn;

/// Maps a raw payload from `provider` onto the canonical snapshot.
///
/// Never fails. A payload from a provider whose feature is disabled yields an
/// empty snapshot, which the screen rejects.
#[must_use]
pub fn normalize(provider: ProviderId, raw: &RawPayload) -> FundamentalSnapshot {
    match provider {
        #[cfg(feature = "eodhd")]
        ProviderId::Eodhd => screener_eodhd::normalize(raw),
        #[cfg(feature = "fmp")]
        ProviderId::Fmp => screener_fmp::normalize(raw),
        #[cfg(feature = "finnhub")]
        ProviderId::Finnhub => screener_finnhub::normalize(raw),
        #[cfg(feature = "alphavantage")]
        ProviderId::AlphaVantage => screener_alphavantage::normalize(raw),
        #[allow(unreachable_patterns)]
        other => {
            warn!(provider = %other, "No normalizer compiled in for provider");
            FundamentalSnapshot::default()
        }
    }
}
