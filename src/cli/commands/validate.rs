//! Validate configuration command.

use anyhow::Result;
use market_config::load_config;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!(
        "Providers: {} (fallback: {})",
        config.provider.primary,
        config
            .provider
            .fallback
            .map(|k| k.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("Max concurrency: {}", config.fetcher.max_concurrency);
    println!("Min request interval: {}ms", config.fetcher.min_request_interval_ms);
    println!("Breaker failure threshold: {}", config.circuit_breaker.failure_threshold);
    println!("L1 capacity: {}", config.cache.l1_capacity);
    println!("L2 store: {:?} ({})", config.cache.store.backend, config.cache.store.dir.display());
    println!("Benchmark: {}", config.indicators.benchmark);

    Ok(())
}
