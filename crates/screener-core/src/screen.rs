//! Screening thresholds and the pass/fail predicate.

use serde::{Deserialize, Serialize};

use crate::types::FundamentalSnapshot;

/// The five value-investing thresholds.
///
/// The comparison operators are fixed: P/E and Debt/Equity must be strictly
/// below their maxima, ROE at or above its minimum, ROIC and EPS growth
/// strictly above theirs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningCriteria {
    /// Upper bound for P/E (exclusive).
    pub pe_max: f64,
    /// Upper bound for Debt/Equity, ratio form (exclusive).
    pub debt_equity_max: f64,
    /// Lower bound for ROE in percent (inclusive).
    pub roe_min: f64,
    /// Lower bound for ROIC in percent (exclusive).
    pub roic_min: f64,
    /// Lower bound for YoY EPS growth in percent (exclusive).
    pub eps_growth_min: f64,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            pe_max: 20.0,
            debt_equity_max: 0.5,
            roe_min: 15.0,
            roic_min: 12.0,
            eps_growth_min: 5.0,
        }
    }
}

impl ScreeningCriteria {
    /// Evaluates a snapshot against these thresholds.
    ///
    /// Any unavailable field rejects the snapshot.
    #[must_use]
    pub fn passes(&self, snapshot: &FundamentalSnapshot) -> bool {
        let (Some(pe), Some(dte), Some(roe), Some(roic), Some(eps)) = (
            snapshot.pe,
            snapshot.debt_to_equity,
            snapshot.roe,
            snapshot.roic,
            snapshot.eps_growth_yoy,
        ) else {
            return false;
        };

        pe < self.pe_max
            && dte < self.debt_equity_max
            && roe >= self.roe_min
            && roic > self.roic_min
            && eps > self.eps_growth_min
    }
}

/// Evaluates `snapshot` against `criteria`.
#[must_use]
pub fn passes(snapshot: &FundamentalSnapshot, criteria: &ScreeningCriteria) -> bool {
    criteria.passes(snapshot)
}
