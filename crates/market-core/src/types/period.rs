//! Lookback periods for market data requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lookback window for a daily bar request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Period {
    /// Five trading days
    #[serde(rename = "5d")]
    FiveDays,
    /// One month
    #[serde(rename = "1mo")]
    OneMonth,
    /// Three months
    #[serde(rename = "3mo")]
    ThreeMonths,
    /// Six months
    #[serde(rename = "6mo")]
    #[default]
    SixMonths,
    /// One year
    #[serde(rename = "1y")]
    OneYear,
    /// Two years
    #[serde(rename = "2y")]
    TwoYears,
    /// Five years
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    /// Approximate length of the window in calendar days.
    pub fn as_days(&self) -> i64 {
        match self {
            Period::FiveDays => 7,
            Period::OneMonth => 31,
            Period::ThreeMonths => 92,
            Period::SixMonths => 183,
            Period::OneYear => 366,
            Period::TwoYears => 731,
            Period::FiveYears => 1827,
        }
    }

    /// Range token understood by the upstream chart API.
    pub fn as_range(&self) -> &'static str {
        match self {
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }

    /// Get all available periods.
    pub fn all() -> &'static [Period] {
        &[
            Period::FiveDays,
            Period::OneMonth,
            Period::ThreeMonths,
            Period::SixMonths,
            Period::OneYear,
            Period::TwoYears,
            Period::FiveYears,
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_range())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "5d" | "week" => Ok(Period::FiveDays),
            "1mo" | "1m" | "month" => Ok(Period::OneMonth),
            "3mo" | "3m" | "quarter" => Ok(Period::ThreeMonths),
            "6mo" | "6m" => Ok(Period::SixMonths),
            "1y" | "year" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            _ => Err(format!("Invalid period: {}", s)),
        }
    }
}
