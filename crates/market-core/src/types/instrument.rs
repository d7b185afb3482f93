//! Instrument classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad instrument class, used to pick data-quality thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentClass {
    /// Single stock
    #[default]
    Equity,
    /// Exchange-traded fund
    Etf,
    /// Index level; volume is not meaningful
    Index,
}

impl InstrumentClass {
    /// Infer the class from ticker conventions alone.
    ///
    /// Only indices can be recognised this way (`^GSPC`); everything else
    /// falls back to `default`.
    pub fn infer(symbol: &str, default: InstrumentClass) -> Self {
        if symbol.starts_with('^') {
            InstrumentClass::Index
        } else {
            default
        }
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstrumentClass::Equity => "equity",
            InstrumentClass::Etf => "etf",
            InstrumentClass::Index => "index",
        };
        f.write_str(s)
    }
}
