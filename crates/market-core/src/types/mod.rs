//! Core data types for the market data core.

mod indicator_set;
mod instrument;
mod ohlcv;
mod period;

pub use indicator_set::{IndicatorSet, Quadrant};
pub use instrument::InstrumentClass;
pub use ohlcv::{Bar, SymbolSeries};
pub use period::Period;
