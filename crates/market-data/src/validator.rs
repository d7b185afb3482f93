//! OHLCV bar validation.
//!
//! Invalid bars are dropped, never clamped. Low-volume bars pass with a
//! quality warning that the service forwards to cache metrics.

use chrono::NaiveDate;
use market_core::error::{FetchError, ValidationError};
use market_core::types::{Bar, InstrumentClass, Period, SymbolSeries};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Default minimum daily volume expected from an exchange-traded fund.
pub const DEFAULT_ETF_MIN_VOLUME: f64 = 100_000.0;

/// Default minimum daily volume expected from a single stock.
pub const DEFAULT_EQUITY_MIN_VOLUME: f64 = 10_000.0;

/// Validation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Volume floor for ETFs
    pub etf_min_volume: f64,
    /// Volume floor for single stocks
    pub equity_min_volume: f64,
    /// Class assumed for symbols not listed in `instrument_classes`
    pub default_class: InstrumentClass,
    /// Explicit per-symbol classes
    pub instrument_classes: HashMap<String, InstrumentClass>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            etf_min_volume: DEFAULT_ETF_MIN_VOLUME,
            equity_min_volume: DEFAULT_EQUITY_MIN_VOLUME,
            default_class: InstrumentClass::Equity,
            instrument_classes: HashMap::new(),
        }
    }
}

/// Non-rejecting data quality signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityWarning {
    /// Volume below the instrument class floor.
    LowVolume { date: NaiveDate, volume: f64, floor: f64 },
}

/// A bar dropped by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedBar {
    /// Position in the upstream response
    pub index: usize,
    /// Bar timestamp in milliseconds
    pub timestamp: i64,
    /// Rejection reason, e.g. `high<low`
    pub reason: String,
}

/// What validation removed or flagged for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub rejected: Vec<RejectedBar>,
    pub warnings: Vec<QualityWarning>,
}

impl ValidationReport {
    /// True when nothing was rejected or flagged.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.warnings.is_empty()
    }
}

/// A series that passed validation, with its report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedSeries {
    pub series: SymbolSeries,
    pub report: ValidationReport,
}

/// Validate a single bar.
///
/// # Returns
/// * `Err` when the bar violates an OHLCV invariant
/// * `Ok(Some(_))` when the bar is valid but carries a quality warning
/// * `Ok(None)` for a clean bar
pub fn validate_bar(bar: &Bar, volume_floor: Option<f64>) -> Result<Option<QualityWarning>, ValidationError> {
    let fields = [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
        ("volume", bar.volume),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ValidationError::NonFinite(*name));
    }

    if bar.open < 0.0 || bar.high < 0.0 || bar.low < 0.0 || bar.close < 0.0 {
        return Err(ValidationError::NegativePrice);
    }
    if bar.high < bar.low {
        return Err(ValidationError::HighBelowLow);
    }
    if bar.high < bar.body_high() {
        return Err(ValidationError::HighBelowBody);
    }
    if bar.low > bar.body_low() {
        return Err(ValidationError::LowAboveBody);
    }
    if bar.volume < 0.0 {
        return Err(ValidationError::NegativeVolume);
    }

    match volume_floor {
        Some(floor) if bar.volume < floor => Ok(Some(QualityWarning::LowVolume {
            date: bar.date(),
            volume: bar.volume,
            floor,
        })),
        _ => Ok(None),
    }
}

/// Validates whole upstream responses.
#[derive(Debug, Clone, Default)]
pub struct BarValidator {
    config: ValidationConfig,
}

impl BarValidator {
    /// Create a validator with the given thresholds.
    ///
    /// Symbol keys are matched case-insensitively.
    pub fn new(mut config: ValidationConfig) -> Self {
        config.instrument_classes = config
            .instrument_classes
            .into_iter()
            .map(|(symbol, class)| (symbol.to_ascii_uppercase(), class))
            .collect();
        Self { config }
    }

    /// Instrument class for a symbol.
    pub fn class_for(&self, symbol: &str) -> InstrumentClass {
        self.config
            .instrument_classes
            .get(&symbol.to_ascii_uppercase())
            .copied()
            .unwrap_or_else(|| InstrumentClass::infer(symbol, self.config.default_class))
    }

    /// Volume floor for a symbol, if its class has one.
    pub fn volume_floor(&self, symbol: &str) -> Option<f64> {
        match self.class_for(symbol) {
            InstrumentClass::Etf => Some(self.config.etf_min_volume),
            InstrumentClass::Equity => Some(self.config.equity_min_volume),
            InstrumentClass::Index => None,
        }
    }

    /// Validate, sort and de-duplicate raw bars.
    ///
    /// Fails the whole symbol when no bar survives.
    pub fn validate_series(&self, symbol: &str, period: Period, raw: Vec<Bar>) -> Result<ValidatedSeries, FetchError> {
        let floor = self.volume_floor(symbol);
        let mut report = ValidationReport::default();
        let mut accepted: Vec<(usize, Bar)> = Vec::with_capacity(raw.len());

        for (index, bar) in raw.into_iter().enumerate() {
            match validate_bar(&bar, floor) {
                Ok(warning) => {
                    if let Some(warning) = warning {
                        debug!(symbol, index, ?warning, "Bar quality warning");
                        report.warnings.push(warning);
                    }
                    accepted.push((index, bar));
                }
                Err(err) => {
                    warn!(symbol, index, reason = %err, "Rejected bar");
                    report.rejected.push(RejectedBar {
                        index,
                        timestamp: bar.timestamp,
                        reason: err.reason(),
                    });
                }
            }
        }

        accepted.sort_by_key(|(_, bar)| bar.timestamp);

        let mut seen: HashSet<NaiveDate> = HashSet::with_capacity(accepted.len());
        let mut bars = Vec::with_capacity(accepted.len());
        for (index, bar) in accepted {
            if seen.insert(bar.date()) {
                bars.push(bar);
            } else {
                let err = ValidationError::DuplicateDate;
                warn!(symbol, index, reason = %err, "Rejected bar");
                report.rejected.push(RejectedBar {
                    index,
                    timestamp: bar.timestamp,
                    reason: err.reason(),
                });
            }
        }

        if bars.is_empty() {
            warn!(symbol, rejected = report.rejected.len(), "No valid bars after validation");
            return Err(FetchError::NoValidBars {
                symbol: symbol.to_string(),
                rejected: report.rejected.len(),
            });
        }

        Ok(ValidatedSeries {
            series: SymbolSeries::new(symbol, period, bars),
            report,
        })
    }
}
