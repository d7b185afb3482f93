//! Derived indicator values for one symbol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotation quadrant from relative strength and its momentum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Outperforming the benchmark and still gaining
    LeadingStrength,
    /// Outperforming the benchmark but losing ground
    WeakeningStrength,
    /// Underperforming the benchmark but catching up
    ImprovingWeakness,
    /// Underperforming the benchmark and falling further behind
    LaggingWeakness,
}

impl Quadrant {
    /// Relative strength level separating outperformance from underperformance.
    pub const NEUTRAL_STRENGTH: f64 = 100.0;

    /// Classify a relative strength / momentum pair.
    ///
    /// Momentum of exactly zero counts as non-positive.
    pub fn classify(relative_strength: f64, momentum: f64) -> Self {
        let strong = relative_strength > Self::NEUTRAL_STRENGTH;
        let rising = momentum > 0.0;
        match (strong, rising) {
            (true, true) => Quadrant::LeadingStrength,
            (true, false) => Quadrant::WeakeningStrength,
            (false, true) => Quadrant::ImprovingWeakness,
            (false, false) => Quadrant::LaggingWeakness,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::LeadingStrength => "Leading Strength",
            Quadrant::WeakeningStrength => "Weakening Strength",
            Quadrant::ImprovingWeakness => "Improving Weakness",
            Quadrant::LaggingWeakness => "Lagging Weakness",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Indicators derived from a validated series.
///
/// Replaced wholesale on every recomputation, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// On-balance volume, same length as the series, `obv[0] == 0`
    pub obv: Vec<f64>,
    /// Chaikin money flow, same length as the series
    pub cmf: Vec<f64>,
    /// First index at which `cmf` is defined; earlier values are reported as zero
    pub cmf_defined_from: usize,
    /// Relative strength against the benchmark, 100 = in line
    pub relative_strength: f64,
    /// Change in relative strength over the momentum lookback
    pub momentum: f64,
    /// Rotation quadrant
    pub quadrant: Quadrant,
    /// The benchmark could not be fetched; relative strength, momentum and
    /// quadrant hold their neutral values
    #[serde(default)]
    pub benchmark_missing: bool,
}

impl IndicatorSet {
    /// Relative strength, or `None` when there was no benchmark to measure against.
    pub fn relative_strength(&self) -> Option<f64> {
        (!self.benchmark_missing).then_some(self.relative_strength)
    }

    /// Rotation quadrant, or `None` when there was no benchmark.
    pub fn quadrant(&self) -> Option<Quadrant> {
        (!self.benchmark_missing).then_some(self.quadrant)
    }

    /// Latest on-balance volume value.
    pub fn last_obv(&self) -> Option<f64> {
        self.obv.last().copied()
    }

    /// Latest Chaikin money flow value, if it is defined.
    pub fn last_cmf(&self) -> Option<f64> {
        if self.cmf.len() > self.cmf_defined_from {
            self.cmf.last().copied()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_classification() {
        assert_eq!(Quadrant::classify(105.0, 1.5), Quadrant::LeadingStrength);
        assert_eq!(Quadrant::classify(105.0, -1.5), Quadrant::WeakeningStrength);
        assert_eq!(Quadrant::classify(95.0, 1.5), Quadrant::ImprovingWeakness);
        assert_eq!(Quadrant::classify(95.0, -1.5), Quadrant::LaggingWeakness);
    }

    #[test]
    fn test_quadrant_tie_breaks() {
        // Zero momentum is non-positive.
        assert_eq!(Quadrant::classify(105.0, 0.0), Quadrant::WeakeningStrength);
        assert_eq!(Quadrant::classify(95.0, 0.0), Quadrant::LaggingWeakness);
        // Exactly 100 is not outperformance.
        assert_eq!(Quadrant::classify(100.0, 2.0), Quadrant::ImprovingWeakness);
    }

    #[test]
    fn test_last_cmf_undefined() {
        let set = IndicatorSet {
            obv: vec![0.0, 10.0],
            cmf: vec![0.0, 0.0],
            cmf_defined_from: 19,
            relative_strength: 100.0,
            momentum: 0.0,
            quadrant: Quadrant::LaggingWeakness,
            benchmark_missing: false,
        };
        assert_eq!(set.last_cmf(), None);
        assert_eq!(set.last_obv(), Some(10.0));
        assert_eq!(set.quadrant(), Some(Quadrant::LaggingWeakness));
    }

    #[test]
    fn test_missing_benchmark_hides_rotation() {
        let json = r#"{"obv":[0.0],"cmf":[0.0],"cmf_defined_from":19,
            "relative_strength":100.0,"momentum":0.0,"quadrant":"lagging_weakness"}"#;
        let mut set: IndicatorSet = serde_json::from_str(json).unwrap();
        assert!(!set.benchmark_missing);
        assert_eq!(set.relative_strength(), Some(100.0));

        set.benchmark_missing = true;
        assert_eq!(set.relative_strength(), None);
        assert_eq!(set.quadrant(), None);
    }
}
