//! Technical indicators for the market data core.
//!
//! This crate provides the indicators derived from validated bar series:
//! - On-balance volume (OBV)
//! - Chaikin money flow (CMF)
//! - Relative strength against a benchmark, its momentum, and the rotation quadrant
//!
//! The volume kernels have SIMD implementations; outputs are deterministic
//! so cached and recomputed values always agree.

pub mod engine;
pub mod money_flow;
pub mod obv;
pub mod relative_strength;
pub mod simd;

pub use engine::{IndicatorConfig, IndicatorEngine};
pub use money_flow::{ChaikinMoneyFlow, CmfOutput, DEFAULT_CMF_PERIOD};
pub use obv::Obv;
pub use relative_strength::{
    period_return, relative_strength, RelativeStrength, RelativeStrengthOutput,
    DEFAULT_MOMENTUM_LOOKBACK,
};
