//! Plain-text health report.

use market_cache::{CacheStats, CounterStats, Health};
use market_data::{CircuitState, CircuitStatus};
use std::fmt::{self, Write};

/// Renders cache statistics and breaker states as fixed-width text.
pub struct HealthView<'a> {
    cache: &'a CacheStats,
    circuits: &'a [CircuitStatus],
}

impl<'a> HealthView<'a> {
    pub fn new(cache: &'a CacheStats, circuits: &'a [CircuitStatus]) -> Self {
        Self { cache, circuits }
    }

    fn render_header(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match &self.cache.health {
            Health::Healthy => "HEALTHY".to_string(),
            Health::Degraded { failing } => format!("DEGRADED ({})", failing.join(", ")),
        };
        let open = self
            .circuits
            .iter()
            .filter(|c| c.state != CircuitState::Closed)
            .count();
        writeln!(out, "Cache health: {status}  |  Circuits not closed: {open}/{}", self.circuits.len())
    }

    fn render_layers(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "{:<24} {:>10} {:>10} {:>9}", "Tier", "Hits", "Misses", "Hit rate")?;
        for (layer, stats) in &self.cache.layers {
            counter_row(out, &layer.to_string(), stats)?;
        }
        counter_row(out, "overall", &self.cache.overall)?;
        for (namespace, stats) in &self.cache.namespaces {
            counter_row(out, &format!("{namespace} (overall)"), &stats.overall)?;
        }
        Ok(())
    }

    fn render_circuits(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.circuits.is_empty() {
            return Ok(());
        }
        writeln!(out)?;
        writeln!(out, "{:<12} {:<10} {:>9} {:>10} {:>9}", "Source", "State", "Failures", "Successes", "Retry in")?;
        for circuit in self.circuits {
            let retry = circuit
                .retry_in_secs
                .map(|s| format!("{s}s"))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "{:<12} {:<10} {:>9} {:>10} {:>9}",
                circuit.source,
                circuit.state.to_string(),
                circuit.failure_count,
                circuit.success_count,
                retry
            )?;
        }
        Ok(())
    }

    fn render_warnings(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cache.quality_warnings.is_empty() {
            return Ok(());
        }
        writeln!(out)?;
        let mut line = String::from("Quality warnings:");
        for (symbol, count) in &self.cache.quality_warnings {
            let _ = write!(line, " {symbol}={count}");
        }
        writeln!(out, "{line}")
    }
}

impl fmt::Display for HealthView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render_header(f)?;
        self.render_layers(f)?;
        self.render_circuits(f)?;
        self.render_warnings(f)
    }
}

fn counter_row(out: &mut fmt::Formatter<'_>, label: &str, stats: &CounterStats) -> fmt::Result {
    let rate = stats
        .hit_rate
        .map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "n/a".to_string());
    writeln!(out, "{:<24} {:>10} {:>10} {:>9}", label, stats.hits, stats.misses, rate)
}
