//! Upstream bar providers.

mod csv_file;
mod yahoo;

pub use self::csv_file::CsvProvider;
pub use self::yahoo::{YahooConfig, YahooProvider};
