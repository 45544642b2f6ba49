//! Region and provider identifiers.
//!
//! This module defines [`Region`], the coarse market grouping a run is
//! configured with, and [`ProviderId`], the tag that selects an adapter and
//! its normalizer.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScreenError;

/// Market region to screen. Each provider maps a region to its own exchange tags.
///
/// Deserializes through [`FromStr`], so configuration files accept the same
/// spellings as the environment and the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// United States venues.
    #[default]
    Us,
    /// European venues.
    Europe,
    /// Asian venues.
    Asia,
}

impl Region {
    /// All regions, in selector order.
    pub const ALL: [Self; 3] = [Self::Us, Self::Europe, Self::Asia];

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Europe => "Europe",
            Self::Asia => "Asia",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Region {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "usa" => Ok(Self::Us),
            "europe" | "eu" => Ok(Self::Europe),
            "asia" => Ok(Self::Asia),
            other => Err(ScreenError::InvalidParameter(format!(
                "Unknown region: {other}. Supported: us, europe, asia"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies one of the supported fundamentals providers.
///
/// Like [`Region`], deserialization is case-insensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// EOD Historical Data.
    Eodhd,
    /// Financial Modeling Prep.
    Fmp,
    /// Finnhub.
    Finnhub,
    /// Alpha Vantage.
    AlphaVantage,
}

impl ProviderId {
    /// All providers.
    pub const ALL: [Self; 4] = [Self::Eodhd, Self::Fmp, Self::Finnhub, Self::AlphaVantage];

    /// Configuration key of this provider.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eodhd => "eodhd",
            Self::Fmp => "fmp",
            Self::Finnhub => "finnhub",
            Self::AlphaVantage => "alphavantage",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eodhd" | "eod" => Ok(Self::Eodhd),
            "fmp" => Ok(Self::Fmp),
            "finnhub" => Ok(Self::Finnhub),
            "alphavantage" | "alpha-vantage" | "alpha_vantage" => Ok(Self::AlphaVantage),
            other => Err(ScreenError::ProviderNotConfigured(format!(
                "Unknown provider: {other}. Supported: eodhd, fmp, finnhub, alphavantage"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
