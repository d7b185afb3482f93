//! Core types and traits for the market data core.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, SymbolSeries, Period)
//! - Derived indicator types (IndicatorSet, Quadrant)
//! - The error taxonomy shared by fetcher, cache and indicator engine
//! - Adapter traits for upstream providers and the shared key-value tier

pub mod types;
pub mod traits;
pub mod error;

pub use error::{MarketError, MarketResult};
pub use types::*;
pub use traits::*;
