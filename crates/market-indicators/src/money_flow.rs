//! Chaikin Money Flow.

use market_core::traits::SeriesIndicator;
use market_core::types::SymbolSeries;

use crate::simd::{money_flow_volume_simd, window_sums_simd};

/// Default CMF window.
pub const DEFAULT_CMF_PERIOD: usize = 20;

/// Chaikin Money Flow output for a whole series.
#[derive(Debug, Clone, PartialEq)]
pub struct CmfOutput {
    /// One value per bar; values before `defined_from` are zero
    pub values: Vec<f64>,
    /// Index of the first bar with a full window behind it
    pub defined_from: usize,
}

/// Chaikin Money Flow (CMF).
///
/// Volume-weighted average of where each close sits within its bar's range,
/// over a rolling window.
#[derive(Debug, Clone)]
pub struct ChaikinMoneyFlow {
    period: usize,
}

impl Default for ChaikinMoneyFlow {
    fn default() -> Self {
        Self::new(DEFAULT_CMF_PERIOD)
    }
}

impl ChaikinMoneyFlow {
    /// Create a new CMF indicator.
    ///
    /// Common period is 20.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// Calculate CMF from OHLCV slices.
    ///
    /// For `i >= period - 1` the value is the window sum of money flow volume
    /// divided by the window sum of volume (zero when no volume traded).
    /// Earlier values are zero and excluded by `defined_from`.
    pub fn calculate_ohlcv(&self, high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> CmfOutput {
        let len = high.len().min(low.len()).min(close.len()).min(volume.len());
        let defined_from = self.period - 1;
        let mut values = vec![0.0; len];

        if len < self.period {
            return CmfOutput { values, defined_from };
        }

        let mfv = money_flow_volume_simd(high, low, close, volume);
        let mfv_sums = window_sums_simd(&mfv, self.period);
        let volume_sums = window_sums_simd(&volume[..len], self.period);

        for (offset, (&flow, &vol)) in mfv_sums.iter().zip(volume_sums.iter()).enumerate() {
            values[defined_from + offset] = if vol == 0.0 { 0.0 } else { flow / vol };
        }

        CmfOutput { values, defined_from }
    }

    /// Calculate CMF for a validated series.
    pub fn calculate_series(&self, series: &SymbolSeries) -> CmfOutput {
        self.calculate_ohlcv(
            &series.highs(),
            &series.lows(),
            &series.closes(),
            &series.volumes(),
        )
    }
}

impl SeriesIndicator for ChaikinMoneyFlow {
    type Output = f64;

    fn calculate(&self, series: &SymbolSeries) -> Vec<f64> {
        self.calculate_series(series).values
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "CMF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmf_leading_values_undefined() {
        let cmf = ChaikinMoneyFlow::new(3);
        let high = vec![12.0, 13.0, 14.0, 15.0];
        let low = vec![10.0, 11.0, 12.0, 13.0];
        let close = vec![12.0, 13.0, 14.0, 15.0];
        let volume = vec![100.0, 100.0, 100.0, 100.0];

        let out = cmf.calculate_ohlcv(&high, &low, &close, &volume);

        assert_eq!(out.defined_from, 2);
        assert_eq!(out.values.len(), 4);
        assert_eq!(out.values[0], 0.0);
        assert_eq!(out.values[1], 0.0);
        // Closing at the high every bar: full buying pressure.
        assert!((out.values[2] - 1.0).abs() < 1e-10);
        assert!((out.values[3] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cmf_window_value() {
        let cmf = ChaikinMoneyFlow::new(2);
        // multipliers: 1.0, -1.0, 0.0
        let high = vec![12.0, 12.0, 12.0];
        let low = vec![10.0, 10.0, 10.0];
        let close = vec![12.0, 10.0, 11.0];
        let volume = vec![300.0, 100.0, 200.0];

        let out = cmf.calculate_ohlcv(&high, &low, &close, &volume);

        // (300 - 100) / 400
        assert!((out.values[1] - 0.5).abs() < 1e-10);
        // (-100 + 0) / 300
        assert!((out.values[2] + 1.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_cmf_zero_range_bar_contributes_zero() {
        let cmf = ChaikinMoneyFlow::new(1);
        let out = cmf.calculate_ohlcv(&[10.0], &[10.0], &[10.0], &[500.0]);

        assert_eq!(out.values, vec![0.0]);
        assert!(out.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_cmf_zero_volume_window() {
        let cmf = ChaikinMoneyFlow::new(2);
        let out = cmf.calculate_ohlcv(&[12.0, 12.0], &[10.0, 10.0], &[12.0, 11.0], &[0.0, 0.0]);

        assert_eq!(out.values, vec![0.0, 0.0]);
    }

    #[test]
    fn test_cmf_insufficient_data() {
        let cmf = ChaikinMoneyFlow::default();
        let out = cmf.calculate_ohlcv(&[12.0; 5], &[10.0; 5], &[11.0; 5], &[1.0; 5]);

        assert_eq!(out.values, vec![0.0; 5]);
        assert_eq!(out.defined_from, DEFAULT_CMF_PERIOD - 1);
    }
}
