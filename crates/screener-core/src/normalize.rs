//! Field extraction and unit conversion helpers.
//!
//! Provider normalizers are written as a handful of lookups into the raw JSON
//! document. The helpers here make every lookup total: a missing path, a
//! `null`, a placeholder string such as `"None"` or `"-"`, a non-finite number
//! or a zero denominator all come back as `None`, never as zero and never as
//! an error.

use serde_json::Value;

/// Scale a provider reports a field in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// A plain ratio; passed through unchanged.
    Ratio,
    /// Already a percentage (15.0 means 15%); passed through unchanged.
    Percent,
    /// A percentage expressed as a fraction (0.15 means 15%); multiplied by 100.
    Fraction,
}

impl Unit {
    /// Converts a value in this unit to the canonical scale.
    #[must_use]
    pub fn to_canonical(self, value: f64) -> f64 {
        match self {
            Self::Ratio | Self::Percent => value,
            Self::Fraction => value * 100.0,
        }
    }
}

/// Walks a path of object keys.
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Reads a finite number from a JSON number or a numeric string.
#[must_use]
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Reads a finite number at a path.
#[must_use]
pub fn number_at(value: &Value, path: &[&str]) -> Option<f64> {
    lookup(value, path).and_then(number)
}

/// Reads a number at a path and converts it to the canonical scale.
#[must_use]
pub fn metric_at(value: &Value, path: &[&str], unit: Unit) -> Option<f64> {
    number_at(value, path).map(|v| unit.to_canonical(v))
}

/// Most recent entry of a provider time series.
///
/// Providers return series newest first, so this is the first element of an
/// array or the first value of an object, in document order.
#[must_use]
pub fn first_entry(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        Value::Object(map) => map.values().next(),
        _ => None,
    }
}

/// Divides two optional values; a zero or missing denominator yields `None`.
#[must_use]
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    Some(n / d).filter(|v| v.is_finite())
}
