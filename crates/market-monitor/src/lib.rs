//! Logging setup and operator-facing health rendering.

mod health;
mod logging;

pub use health::HealthView;
pub use logging::setup_logging;
