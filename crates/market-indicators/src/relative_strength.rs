//! Relative strength against a benchmark and rotation momentum.

use market_core::types::{Quadrant, SymbolSeries};
use std::collections::HashMap;

/// Default number of bars used to measure relative strength momentum.
pub const DEFAULT_MOMENTUM_LOOKBACK: usize = 5;

/// Relative strength reported when the comparison is undefined.
pub const IN_LINE_STRENGTH: f64 = 100.0;

/// Period return `(last - first) / first`.
///
/// Zero for fewer than two points or a zero starting price.
pub fn period_return(closes: &[f64]) -> f64 {
    match (closes.first(), closes.last()) {
        (Some(&first), Some(&last)) if closes.len() >= 2 && first != 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

/// Relative strength `(sector_return / benchmark_return) * 100`.
///
/// A flat benchmark yields 100 ("in line") instead of a division error.
pub fn relative_strength(sector: &[f64], benchmark: &[f64]) -> f64 {
    let benchmark_return = period_return(benchmark);
    if benchmark_return == 0.0 {
        return IN_LINE_STRENGTH;
    }
    (period_return(sector) / benchmark_return) * 100.0
}

/// Close prices of both series restricted to the dates they share.
pub fn align_closes(series: &SymbolSeries, benchmark: &SymbolSeries) -> (Vec<f64>, Vec<f64>) {
    let bench_by_date: HashMap<_, f64> = benchmark.iter().map(|b| (b.date(), b.close)).collect();

    series
        .iter()
        .filter_map(|bar| bench_by_date.get(&bar.date()).map(|&bench| (bar.close, bench)))
        .unzip()
}

/// Relative strength, momentum and quadrant for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeStrengthOutput {
    /// Relative strength over the aligned window
    pub relative_strength: f64,
    /// Change in relative strength over the lookback
    pub momentum: f64,
    /// Rotation quadrant
    pub quadrant: Quadrant,
    /// Number of dates both series share
    pub aligned_bars: usize,
}

/// Relative strength against a benchmark, with momentum.
#[derive(Debug, Clone)]
pub struct RelativeStrength {
    momentum_lookback: usize,
}

impl Default for RelativeStrength {
    fn default() -> Self {
        Self::new(DEFAULT_MOMENTUM_LOOKBACK)
    }
}

impl RelativeStrength {
    /// Create a new relative strength calculator.
    pub fn new(momentum_lookback: usize) -> Self {
        assert!(momentum_lookback > 0, "Momentum lookback must be greater than 0");
        Self { momentum_lookback }
    }

    /// Momentum: relative strength now minus relative strength
    /// `momentum_lookback` bars ago, both measured from the window start.
    ///
    /// Zero when the aligned window is too short to have an earlier reading.
    pub fn momentum(&self, sector: &[f64], benchmark: &[f64]) -> f64 {
        let len = sector.len().min(benchmark.len());
        if len < self.momentum_lookback + 2 {
            return 0.0;
        }

        let earlier_end = len - self.momentum_lookback;
        let now = relative_strength(&sector[..len], &benchmark[..len]);
        let earlier = relative_strength(&sector[..earlier_end], &benchmark[..earlier_end]);
        now - earlier
    }

    /// Compute relative strength, momentum and quadrant on the shared dates.
    pub fn compute(&self, series: &SymbolSeries, benchmark: &SymbolSeries) -> RelativeStrengthOutput {
        let (sector, bench) = align_closes(series, benchmark);
        let rs = relative_strength(&sector, &bench);
        let momentum = self.momentum(&sector, &bench);

        RelativeStrengthOutput {
            relative_strength: rs,
            momentum,
            quadrant: Quadrant::classify(rs, momentum),
            aligned_bars: sector.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use market_core::types::{Bar, Period};

    fn series(symbol: &str, closes: &[f64]) -> SymbolSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let date = start + chrono::Duration::days(i as i64);
                Bar::on_date(date, c, c, c, c, 1_000.0)
            })
            .collect();
        SymbolSeries::new(symbol, Period::OneMonth, bars)
    }

    #[test]
    fn test_period_return() {
        assert!((period_return(&[100.0, 105.0]) - 0.05).abs() < 1e-12);
        assert_eq!(period_return(&[100.0]), 0.0);
        assert_eq!(period_return(&[]), 0.0);
        assert_eq!(period_return(&[0.0, 5.0]), 0.0);
    }

    #[test]
    fn test_relative_strength_flat_benchmark() {
        let rs = relative_strength(&[100.0, 105.0], &[200.0, 200.0]);
        assert_eq!(rs, 100.0);
        assert!(rs.is_finite());
    }

    #[test]
    fn test_relative_strength_ratio() {
        // +10% vs +5%
        let rs = relative_strength(&[100.0, 110.0], &[100.0, 105.0]);
        assert!((rs - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_alignment_uses_common_dates() {
        let sector = series("XLK", &[10.0, 11.0, 12.0]);
        let bench_bars: Vec<Bar> = sector.bars()[1..].to_vec();
        let bench = SymbolSeries::new("SPY", Period::OneMonth, bench_bars);

        let (s, b) = align_closes(&sector, &bench);
        assert_eq!(s, vec![11.0, 12.0]);
        assert_eq!(b, vec![11.0, 12.0]);
    }

    #[test]
    fn test_momentum_short_window_is_zero() {
        let calc = RelativeStrength::new(5);
        assert_eq!(calc.momentum(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_leading_quadrant() {
        // Sector accelerates away from a steadily rising benchmark.
        let sector = series("XLK", &[100.0, 101.0, 102.0, 103.0, 106.0, 110.0, 115.0, 121.0]);
        let bench = series("SPY", &[100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0]);

        let out = RelativeStrength::new(3).compute(&sector, &bench);

        assert_eq!(out.aligned_bars, 8);
        assert!(out.relative_strength > 100.0);
        assert!(out.momentum > 0.0);
        assert_eq!(out.quadrant, Quadrant::LeadingStrength);
    }

    #[test]
    fn test_flat_benchmark_quadrant() {
        let sector = series("XLE", &[100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 105.0]);
        let bench = series("SPY", &[100.0; 7]);

        let out = RelativeStrength::new(2).compute(&sector, &bench);

        assert_eq!(out.relative_strength, 100.0);
        assert_eq!(out.momentum, 0.0);
        assert_eq!(out.quadrant, Quadrant::LaggingWeakness);
    }
}
