//! Snapshot command implementation.

use anyhow::{Context, Result};
use market_config::AppConfig;
use market_monitor::HealthView;
use market_service::{HealthReport, MarketContext, Snapshot, SnapshotService, SymbolResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::cli::{OutputFormat, SnapshotArgs};

#[derive(Serialize)]
struct SnapshotOutput<'a> {
    snapshot: &'a Snapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<&'a HealthReport>,
}

pub async fn run(args: SnapshotArgs, config: &AppConfig) -> Result<()> {
    let ctx = MarketContext::from_config(config).context("Failed to build market context")?;
    let service = SnapshotService::new(Arc::new(ctx));

    info!(symbols = ?args.symbols, period = %args.period, "Requesting snapshot");
    let snapshot = service.get_snapshot(&args.symbols, args.period).await;
    let health = (!args.no_health).then(|| service.get_health());

    match args.output {
        OutputFormat::Json => {
            let output = SnapshotOutput {
                snapshot: &snapshot,
                health: health.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print_snapshot(&snapshot);
            if let Some(health) = &health {
                println!();
                print!("{}", HealthView::new(&health.cache, &health.circuits));
            }
        }
    }

    if snapshot.succeeded() == 0 && !snapshot.results.is_empty() {
        anyhow::bail!("No symbol could be served");
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "Snapshot {} | {} ok, {} failed | source: {:?}",
        snapshot.period,
        snapshot.succeeded(),
        snapshot.failed(),
        snapshot.cache_source
    );
    println!();
    println!(
        "{:<8} {:<9} {:>5} {:>10} {:>14} {:>8} {:>8} {:<18} {:>8}",
        "Symbol", "Source", "Bars", "Close", "OBV", "CMF", "RS", "Quadrant", "Rejected"
    );
    for result in &snapshot.results {
        print_row(result);
    }
}

fn print_row(result: &SymbolResult) {
    let source = result
        .source
        .map(|s| format!("{s:?}"))
        .unwrap_or_else(|| "-".to_string());

    match &result.result {
        Ok(snap) => {
            let close = snap.series.last().map(|b| b.close).unwrap_or(f64::NAN);
            let obv = snap.indicators.last_obv().unwrap_or(f64::NAN);
            let cmf = snap.indicators.last_cmf().unwrap_or(f64::NAN);
            let rs = snap
                .indicators
                .relative_strength()
                .map(|rs| format!("{rs:.2}"))
                .unwrap_or_else(|| "n/a".to_string());
            let quadrant = snap.indicators.quadrant().map_or("no benchmark", |q| q.label());
            println!(
                "{:<8} {:<9} {:>5} {:>10.2} {:>14.0} {:>8.3} {:>8} {:<18} {:>8}",
                result.symbol,
                source,
                snap.series.len(),
                close,
                obv,
                cmf,
                rs,
                quadrant,
                snap.report.rejected.len()
            );
        }
        Err(e) => println!("{:<8} {:<9} error: {}", result.symbol, source, e),
    }
}
