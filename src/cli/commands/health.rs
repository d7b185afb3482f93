//! Health command implementation.

use anyhow::{Context, Result};
use market_config::AppConfig;
use market_monitor::HealthView;
use market_service::{MarketContext, SnapshotService};
use std::sync::Arc;

use crate::cli::{HealthArgs, OutputFormat};

pub async fn run(args: HealthArgs, config: &AppConfig) -> Result<()> {
    let ctx = MarketContext::from_config(config).context("Failed to build market context")?;
    let service = SnapshotService::new(Arc::new(ctx));
    let report = service.get_health();

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!(
                "L2 store: {} | benchmark: {}",
                service.context().cache().l2_name(),
                service.context().benchmark()
            );
            print!("{}", HealthView::new(&report.cache, &report.circuits));
        }
    }
    Ok(())
}
