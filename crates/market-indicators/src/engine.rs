//! Indicator engine: turns a validated series into an [`IndicatorSet`].

use market_core::error::IndicatorError;
use market_core::traits::SeriesIndicator;
use market_core::types::{IndicatorSet, Quadrant, SymbolSeries};
use serde::{Deserialize, Serialize};

use crate::money_flow::{ChaikinMoneyFlow, DEFAULT_CMF_PERIOD};
use crate::obv::Obv;
use crate::relative_strength::{RelativeStrength, DEFAULT_MOMENTUM_LOOKBACK};

/// Indicator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Chaikin money flow window
    pub cmf_period: usize,
    /// Bars over which relative strength momentum is measured
    pub momentum_lookback: usize,
    /// Benchmark symbol relative strength is measured against
    pub benchmark: String,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            cmf_period: DEFAULT_CMF_PERIOD,
            momentum_lookback: DEFAULT_MOMENTUM_LOOKBACK,
            benchmark: "SPY".to_string(),
        }
    }
}

/// Computes every derived indicator for a symbol.
///
/// Stateless: the same inputs always produce a bit-identical set.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    obv: Obv,
    cmf: ChaikinMoneyFlow,
    relative_strength: RelativeStrength,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(&IndicatorConfig::default())
    }
}

impl IndicatorEngine {
    /// Create an engine from configuration.
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            obv: Obv::new(),
            cmf: ChaikinMoneyFlow::new(config.cmf_period),
            relative_strength: RelativeStrength::new(config.momentum_lookback),
        }
    }

    /// Compute the indicator set for `series` against `benchmark`.
    ///
    /// Without a benchmark the volume indicators are still computed and the
    /// rotation fields are left neutral, with `benchmark_missing` set.
    pub fn compute(
        &self,
        series: &SymbolSeries,
        benchmark: Option<&SymbolSeries>,
    ) -> Result<IndicatorSet, IndicatorError> {
        self.obv.validate_data(series)?;

        let obv = self.obv.calculate(series);
        let cmf = self.cmf.calculate_series(series);
        let (relative_strength, momentum, quadrant) = match benchmark {
            Some(benchmark) => {
                let rs = self.relative_strength.compute(series, benchmark);
                (rs.relative_strength, rs.momentum, rs.quadrant)
            }
            None => (
                Quadrant::NEUTRAL_STRENGTH,
                0.0,
                Quadrant::classify(Quadrant::NEUTRAL_STRENGTH, 0.0),
            ),
        };

        Ok(IndicatorSet {
            obv,
            cmf: cmf.values,
            cmf_defined_from: cmf.defined_from,
            relative_strength,
            momentum,
            quadrant,
            benchmark_missing: benchmark.is_none(),
        })
    }
}
