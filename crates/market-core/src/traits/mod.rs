//! Core traits for the market data core.

mod indicator;
mod kv_store;
mod provider;

pub use indicator::SeriesIndicator;
pub use kv_store::KvStore;
pub use provider::BarProvider;
