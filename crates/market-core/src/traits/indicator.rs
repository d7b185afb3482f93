//! Indicator trait definitions.

use crate::error::IndicatorError;
use crate::types::SymbolSeries;

/// Indicator computed from a full OHLCV series.
///
/// Implementations must be pure: the same series always yields the same
/// output, bit for bit.
pub trait SeriesIndicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values for the given series.
    ///
    /// # Arguments
    /// * `series` - Validated, time-ascending bars
    ///
    /// # Returns
    /// One value per bar
    fn calculate(&self, series: &SymbolSeries) -> Vec<Self::Output>;

    /// Get the minimum number of bars for a fully defined value.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Validate that there's enough data.
    fn validate_data(&self, series: &SymbolSeries) -> Result<(), IndicatorError> {
        if series.len() < self.period() {
            return Err(IndicatorError::InsufficientData {
                required: self.period(),
                available: series.len(),
            });
        }
        Ok(())
    }
}
