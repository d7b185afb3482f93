//! CLI command implementations.

pub mod health;
pub mod snapshot;
pub mod validate;
