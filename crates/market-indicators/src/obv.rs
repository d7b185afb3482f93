//! On-balance volume.

use market_core::traits::SeriesIndicator;
use market_core::types::SymbolSeries;

/// On-Balance Volume (OBV).
///
/// Cumulative volume flow: volume is added on up closes and subtracted on
/// down closes. The series starts at zero rather than at the first bar's
/// volume, so values track trend direction consistently but are not
/// comparable in absolute terms across symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct Obv;

impl Obv {
    /// Create a new OBV indicator.
    pub fn new() -> Self {
        Self
    }

    /// Calculate OBV from close and volume slices.
    pub fn calculate_raw(close: &[f64], volume: &[f64]) -> Vec<f64> {
        let len = close.len().min(volume.len());
        if len == 0 {
            return vec![];
        }

        let mut result = Vec::with_capacity(len);
        let mut obv = 0.0;
        result.push(obv);

        for i in 1..len {
            if close[i] > close[i - 1] {
                obv += volume[i];
            } else if close[i] < close[i - 1] {
                obv -= volume[i];
            }
            result.push(obv);
        }

        result
    }
}

impl SeriesIndicator for Obv {
    type Output = f64;

    fn calculate(&self, series: &SymbolSeries) -> Vec<f64> {
        Self::calculate_raw(&series.closes(), &series.volumes())
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "OBV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obv_rising_close_adds_volume() {
        let result = Obv::calculate_raw(&[11.0, 12.0], &[1000.0, 1200.0]);
        assert_eq!(result, vec![0.0, 1200.0]);
    }

    #[test]
    fn test_obv_directions() {
        let close = vec![10.0, 11.0, 10.5, 10.5, 12.0];
        let volume = vec![500.0, 100.0, 40.0, 999.0, 60.0];
        let result = Obv::calculate_raw(&close, &volume);

        assert_eq!(result, vec![0.0, 100.0, 60.0, 60.0, 120.0]);
    }

    #[test]
    fn test_obv_same_length_and_zero_start() {
        let close: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.4).sin()).collect();
        let volume = vec![1_000.0; 50];
        let result = Obv::calculate_raw(&close, &volume);

        assert_eq!(result.len(), close.len());
        assert_eq!(result[0], 0.0);
    }

    #[test]
    fn test_obv_empty() {
        assert!(Obv::calculate_raw(&[], &[]).is_empty());
    }
}
