//! Core data types for a screening run.
//!
//! This module defines the records that flow through the pipeline:
//!
//! - [`Symbol`] - One security to evaluate, as listed by a provider
//! - [`RawPayload`] - A provider's unparsed fundamentals response
//! - [`FundamentalSnapshot`] - Canonical, provider-independent metrics
//! - [`ScreenResult`] - One evaluated row of pipeline output

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A security listed by a provider for one exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Exchange-local ticker.
    pub code: String,
    /// Provider-specific exchange identifier (e.g. "LSE", "NASDAQ").
    pub exchange_tag: String,
    /// Identifier the provider expects in its fundamentals request.
    pub composite: String,
    /// Human-readable company name, possibly empty.
    pub display_name: String,
}

impl Symbol {
    /// Creates a symbol whose composite identifier equals its code.
    #[must_use]
    pub fn new(code: impl Into<String>, exchange_tag: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            composite: code.clone(),
            code,
            exchange_tag: exchange_tag.into(),
            display_name: String::new(),
        }
    }

    /// Creates a symbol whose composite identifier is `code.exchange_tag`.
    #[must_use]
    pub fn dotted(code: impl Into<String>, exchange_tag: impl Into<String>) -> Self {
        let code = code.into();
        let exchange_tag = exchange_tag.into();
        Self {
            composite: format!("{code}.{exchange_tag}"),
            code,
            exchange_tag,
            display_name: String::new(),
        }
    }

    /// Overrides the composite identifier.
    #[must_use]
    pub fn with_composite(mut self, composite: impl Into<String>) -> Self {
        self.composite = composite.into();
        self
    }

    /// Sets the company name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Returns the composite identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.composite
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.composite)
    }
}

/// A provider's fundamentals response, kept exactly as received.
///
/// Adapters that need several requests assemble the individual bodies into
/// one JSON object; no field is interpreted until normalization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Value);

impl RawPayload {
    /// Wraps a JSON document.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the payload and returns the JSON document.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Canonical fundamentals of one company at fetch time.
///
/// Every field is either a finite number or `None` (unavailable). Ratios are
/// plain ratios; `roe`, `roic` and `eps_growth_yoy` are on a percentage scale
/// (15.0 means 15%).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    /// Price-to-earnings ratio.
    pub pe: Option<f64>,
    /// Total debt divided by total equity.
    pub debt_to_equity: Option<f64>,
    /// Return on equity, percent.
    pub roe: Option<f64>,
    /// Return on invested capital (or a documented proxy), percent.
    pub roic: Option<f64>,
    /// Year-over-year EPS growth, percent.
    pub eps_growth_yoy: Option<f64>,
}

impl FundamentalSnapshot {
    /// Names of the five canonical fields, in declaration order.
    pub const FIELDS: [&'static str; 5] = ["pe", "debt_to_equity", "roe", "roic", "eps_growth_yoy"];

    /// Creates a snapshot, discarding any non-finite value.
    #[must_use]
    pub fn new(
        pe: Option<f64>,
        debt_to_equity: Option<f64>,
        roe: Option<f64>,
        roic: Option<f64>,
        eps_growth_yoy: Option<f64>,
    ) -> Self {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Self {
            pe: finite(pe),
            debt_to_equity: finite(debt_to_equity),
            roe: finite(roe),
            roic: finite(roic),
            eps_growth_yoy: finite(eps_growth_yoy),
        }
    }

    fn values(&self) -> [Option<f64>; 5] {
        [
            self.pe,
            self.debt_to_equity,
            self.roe,
            self.roic,
            self.eps_growth_yoy,
        ]
    }

    /// Returns true if all five fields are available.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.values().iter().all(Option::is_some)
    }

    /// Names of the fields that are unavailable.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .zip(self.values())
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}

/// One evaluated row of pipeline output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    /// The evaluated security.
    pub symbol: Symbol,
    /// Company name, as listed.
    pub display_name: String,
    /// Normalized fundamentals the decision was based on.
    pub snapshot: FundamentalSnapshot,
    /// Whether the snapshot met every threshold.
    pub passed: bool,
}

impl ScreenResult {
    /// Creates a result row; the display name is taken from the symbol.
    #[must_use]
    pub fn new(symbol: Symbol, snapshot: FundamentalSnapshot, passed: bool) -> Self {
        Self {
            display_name: symbol.display_name.clone(),
            symbol,
            snapshot,
            passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_composites() {
        let plain = Symbol::new("AAPL", "NASDAQ");
        assert_eq!(plain.as_str(), "AAPL");

        let dotted = Symbol::dotted("VOD", "LSE").with_display_name("Vodafone Group");
        assert_eq!(dotted.composite, "VOD.LSE");
        assert_eq!(dotted.to_string(), "VOD.LSE");
        assert_eq!(dotted.display_name, "Vodafone Group");
    }

    #[test]
    fn test_snapshot_discards_non_finite() {
        let snapshot = FundamentalSnapshot::new(
            Some(f64::NAN),
            Some(0.2),
            Some(f64::INFINITY),
            Some(14.0),
            None,
        );
        assert_eq!(snapshot.pe, None);
        assert_eq!(snapshot.debt_to_equity, Some(0.2));
        assert_eq!(snapshot.roe, None);
        assert!(!snapshot.is_complete());
        assert_eq!(
            snapshot.missing_fields(),
            vec!["pe", "roe", "eps_growth_yoy"]
        );
    }

    #[test]
    fn test_zero_is_a_value() {
        let snapshot = FundamentalSnapshot::new(Some(0.0), Some(0.0), Some(0.0), Some(0.0), Some(0.0));
        assert!(snapshot.is_complete());
        assert!(snapshot.missing_fields().is_empty());
    }

    #[test]
    fn test_result_copies_display_name() {
        let symbol = Symbol::dotted("SAP", "XETRA").with_display_name("SAP SE");
        let result = ScreenResult::new(symbol, FundamentalSnapshot::default(), false);
        assert_eq!(result.display_name, "SAP SE");
    }
}
