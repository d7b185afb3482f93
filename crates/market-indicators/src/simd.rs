//! SIMD-optimized kernels for the volume indicators.
//!
//! These implementations use the `wide` crate for portable SIMD operations.
//! Every lane performs the same IEEE operations in the same order as the
//! scalar fallback, so results are identical to the scalar formulas.

use wide::{f64x4, CmpEq};

/// Money flow multiplier for a single bar.
///
/// `((close - low) - (high - close)) / (high - low)`, or exactly zero when
/// the bar has no range.
#[inline]
pub fn money_flow_multiplier(high: f64, low: f64, close: f64) -> f64 {
    let range = high - low;
    if range == 0.0 {
        0.0
    } else {
        ((close - low) - (high - close)) / range
    }
}

/// SIMD-optimized money flow volume (`multiplier * volume`) per bar.
///
/// Slices are truncated to the shortest input.
pub fn money_flow_volume_simd(high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
    let len = high.len().min(low.len()).min(close.len()).min(volume.len());
    let mut result = Vec::with_capacity(len);
    let chunks = len / 4;
    let zero = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let h = f64x4::new([high[idx], high[idx + 1], high[idx + 2], high[idx + 3]]);
        let l = f64x4::new([low[idx], low[idx + 1], low[idx + 2], low[idx + 3]]);
        let c = f64x4::new([close[idx], close[idx + 1], close[idx + 2], close[idx + 3]]);
        let v = f64x4::new([volume[idx], volume[idx + 1], volume[idx + 2], volume[idx + 3]]);

        let range = h - l;
        let raw = ((c - l) - (h - c)) / range;
        // Zero-range lanes divided by zero; replace them before they spread.
        let multiplier = range.cmp_eq(zero).blend(zero, raw);

        result.extend((multiplier * v).to_array());
    }

    // Handle remaining elements
    for i in (chunks * 4)..len {
        result.push(money_flow_multiplier(high[i], low[i], close[i]) * volume[i]);
    }

    result
}

/// SIMD-optimized sum of a slice.
pub fn sum_simd(data: &[f64]) -> f64 {
    let chunks = data.len() / 4;
    let mut simd_sum = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let values = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        simd_sum += values;
    }

    let mut result = simd_sum.reduce_add();

    // Handle remaining elements
    for &value in &data[(chunks * 4)..] {
        result += value;
    }

    result
}

/// Sum of every `period`-long window, one value per window.
///
/// Each window is summed from scratch rather than with a running
/// add/subtract, so a window of zeros sums to exactly zero.
pub fn window_sums_simd(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    data.windows(period).map(sum_simd).collect()
}
