//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use market_core::types::Period;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "market-snapshot")]
#[command(author, version, about = "Rate-limited market data snapshots with tiered caching")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (defaults to `logging.level` from the configuration)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch or serve from cache a snapshot for a set of symbols
    Snapshot(SnapshotArgs),
    /// Show cache and circuit breaker health
    Health(HealthArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct SnapshotArgs {
    /// Symbols (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Lookback period (5d, 1mo, 3mo, 6mo, 1y, 2y, 5y)
    #[arg(short, long, default_value = "6mo")]
    pub period: Period,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Skip the health report after the results
    #[arg(long)]
    pub no_health: bool,
}

#[derive(clap::Args)]
pub struct HealthArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}
