//! Cache hit-rate metrics and health evaluation.
//!
//! Counters are lock-free atomics. A read-write lock only guards creation of
//! the per-namespace counter slots.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    L1,
    L2,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::L1 => f.write_str("l1"),
            Layer::L2 => f.write_str("l2"),
        }
    }
}

/// Health floors and sampling rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub l1_floor: f64,
    pub l2_floor: f64,
    pub overall_floor: f64,
    pub namespace_floor: f64,
    /// Lookups required before a layer or the overall rate is judged
    pub min_samples: u64,
    /// Lookups required before a namespace is judged
    pub namespace_min_samples: u64,
    /// Minimum spacing between repeated warnings for one dimension
    pub warning_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            l1_floor: 0.70,
            l2_floor: 0.60,
            overall_floor: 0.70,
            namespace_floor: 0.65,
            min_samples: 10,
            namespace_min_samples: 5,
            warning_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Default)]
struct Counter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counter {
    fn record(&self, hit: bool) {
        let slot = if hit { &self.hits } else { &self.misses };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CounterStats {
        CounterStats::new(self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
struct LayerCounters {
    l1: Counter,
    l2: Counter,
}

impl LayerCounters {
    fn get(&self, layer: Layer) -> &Counter {
        match layer {
            Layer::L1 => &self.l1,
            Layer::L2 => &self.l2,
        }
    }
}

/// Hit/miss totals for one counter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterStats {
    pub hits: u64,
    pub misses: u64,
    /// `None` until at least one lookup
    pub hit_rate: Option<f64>,
}

impl CounterStats {
    fn new(hits: u64, misses: u64) -> Self {
        let lookups = hits + misses;
        Self {
            hits,
            misses,
            hit_rate: (lookups > 0).then(|| hits as f64 / lookups as f64),
        }
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Per-namespace view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub l1: CounterStats,
    pub l2: CounterStats,
    /// Requests served by either tier
    pub overall: CounterStats,
}

/// Outcome of evaluating the floors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Degraded { failing: Vec<String> },
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Health::Healthy)
    }
}

/// Point-in-time metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub layers: BTreeMap<Layer, CounterStats>,
    pub overall: CounterStats,
    pub namespaces: BTreeMap<String, NamespaceStats>,
    /// Quality warnings per symbol
    pub quality_warnings: BTreeMap<String, u64>,
    pub health: Health,
}

/// Requests served by either tier, measured against L1 lookups.
fn overall(l1: &CounterStats, l2: &CounterStats) -> CounterStats {
    let served = (l1.hits + l2.hits).min(l1.lookups());
    CounterStats::new(served, l1.lookups() - served)
}

/// Atomic hit/miss counters with floor-based health.
#[derive(Debug)]
pub struct CacheMetrics {
    config: MetricsConfig,
    layers: LayerCounters,
    namespaces: RwLock<HashMap<String, Arc<LayerCounters>>>,
    quality_warnings: RwLock<HashMap<String, Arc<AtomicU64>>>,
    last_warning: Mutex<HashMap<String, Instant>>,
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl CacheMetrics {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            layers: LayerCounters::default(),
            namespaces: RwLock::new(HashMap::new()),
            quality_warnings: RwLock::new(HashMap::new()),
            last_warning: Mutex::new(HashMap::new()),
        }
    }

    fn namespace(&self, name: &str) -> Arc<LayerCounters> {
        if let Some(counters) = self.namespaces.read().unwrap_or_else(PoisonError::into_inner).get(name) {
            return Arc::clone(counters);
        }
        let mut namespaces = self.namespaces.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(namespaces.entry(name.to_string()).or_default())
    }

    fn record(&self, layer: Layer, namespace: Option<&str>, hit: bool) {
        self.layers.get(layer).record(hit);
        if let Some(name) = namespace {
            self.namespace(name).get(layer).record(hit);
        }
    }

    pub fn record_hit(&self, layer: Layer, namespace: Option<&str>) {
        self.record(layer, namespace, true);
    }

    pub fn record_miss(&self, layer: Layer, namespace: Option<&str>) {
        self.record(layer, namespace, false);
    }

    /// Count a non-rejecting data quality warning for `symbol`.
    pub fn record_quality_warning(&self, symbol: &str) {
        let existing = self
            .quality_warnings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .cloned();
        let counter = match existing {
            Some(counter) => counter,
            None => Arc::clone(
                self.quality_warnings
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(symbol.to_string())
                    .or_default(),
            ),
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot counters and evaluate health without logging.
    pub fn stats(&self) -> CacheStats {
        let l1 = self.layers.l1.snapshot();
        let l2 = self.layers.l2.snapshot();

        let namespaces: BTreeMap<String, NamespaceStats> = self
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, counters)| {
                let ns_l1 = counters.l1.snapshot();
                let ns_l2 = counters.l2.snapshot();
                let stats = NamespaceStats {
                    l1: ns_l1,
                    l2: ns_l2,
                    overall: overall(&ns_l1, &ns_l2),
                };
                (name.clone(), stats)
            })
            .collect();

        let quality_warnings = self
            .quality_warnings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(symbol, count)| (symbol.clone(), count.load(Ordering::Relaxed)))
            .collect();

        let total = overall(&l1, &l2);
        let mut stats = CacheStats {
            layers: BTreeMap::from([(Layer::L1, l1), (Layer::L2, l2)]),
            overall: total,
            namespaces,
            quality_warnings,
            health: Health::Healthy,
        };
        stats.health = self.evaluate(&stats);
        stats
    }

    fn evaluate(&self, stats: &CacheStats) -> Health {
        let c = &self.config;
        let below = |s: &CounterStats, floor: f64, min: u64| {
            s.lookups() >= min && s.hit_rate.is_some_and(|rate| rate < floor)
        };

        let mut failing = Vec::new();
        if let Some(l1) = stats.layers.get(&Layer::L1) {
            if below(l1, c.l1_floor, c.min_samples) {
                failing.push("l1".to_string());
            }
        }
        if let Some(l2) = stats.layers.get(&Layer::L2) {
            if below(l2, c.l2_floor, c.min_samples) {
                failing.push("l2".to_string());
            }
        }
        if below(&stats.overall, c.overall_floor, c.min_samples) {
            failing.push("overall".to_string());
        }
        for (name, ns) in &stats.namespaces {
            if below(&ns.overall, c.namespace_floor, c.namespace_min_samples) {
                failing.push(format!("namespace:{name}"));
            }
        }

        if failing.is_empty() {
            Health::Healthy
        } else {
            Health::Degraded { failing }
        }
    }

    /// Evaluate health and warn about failing dimensions.
    ///
    /// Each dimension is warned about at most once per `warning_interval`.
    pub fn check_health(&self) -> Health {
        let stats = self.stats();
        if let Health::Degraded { failing } = &stats.health {
            let now = Instant::now();
            let interval = Duration::from_secs(self.config.warning_interval_secs);
            let mut last = self.last_warning.lock().unwrap_or_else(PoisonError::into_inner);

            for dimension in failing {
                let due = last.get(dimension).map_or(true, |at| now.duration_since(*at) >= interval);
                if !due {
                    continue;
                }
                last.insert(dimension.clone(), now);
                warn!(
                    dimension = %dimension,
                    hit_rate = ?self.rate_for(&stats, dimension),
                    "Cache hit rate below floor"
                );
            }
        }
        stats.health
    }

    fn rate_for(&self, stats: &CacheStats, dimension: &str) -> Option<f64> {
        match dimension {
            "l1" => stats.layers.get(&Layer::L1).and_then(|s| s.hit_rate),
            "l2" => stats.layers.get(&Layer::L2).and_then(|s| s.hit_rate),
            "overall" => stats.overall.hit_rate,
            other => other
                .strip_prefix("namespace:")
                .and_then(|name| stats.namespaces.get(name))
                .and_then(|ns| ns.overall.hit_rate),
        }
    }

    #[cfg(test)]
    fn warned_recently(&self, dimension: &str) -> bool {
        let interval = Duration::from_secs(self.config.warning_interval_secs);
        self.last_warning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dimension)
            .is_some_and(|at| at.elapsed() < interval)
    }
}
