//! Per-node-kind timing
//!
//! The interpreter records one sample per executed statement under the
//! statement's kind name. Samples are aggregated lock-free; a report is a
//! snapshot and recording continues while it is taken.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug)]
struct KindStats {
    count: AtomicU64,
    total_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl Default for KindStats {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
        }
    }
}

impl KindStats {
    fn update(&self, ns: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);

        let mut current = self.min_ns.load(Ordering::Relaxed);
        while ns < current {
            match self
                .min_ns
                .compare_exchange_weak(current, ns, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        let mut current = self.max_ns.load(Ordering::Relaxed);
        while ns > current {
            match self
                .max_ns
                .compare_exchange_weak(current, ns, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    fn snapshot(&self, kind: &str) -> KindReport {
        let count = self.count.load(Ordering::Relaxed);
        let total_ns = self.total_ns.load(Ordering::Relaxed);
        let min_ns = self.min_ns.load(Ordering::Relaxed);
        KindReport {
            kind: kind.to_string(),
            count,
            total_ns,
            avg_ns: if count > 0 { total_ns / count } else { 0 },
            min_ns: if min_ns == u64::MAX { 0 } else { min_ns },
            max_ns: self.max_ns.load(Ordering::Relaxed),
        }
    }
}

/// Aggregated timings for one statement kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub kind: String,
    pub count: u64,
    pub total_ns: u64,
    pub avg_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
}

#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    stats: DashMap<String, KindStats>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: &str, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        if let Some(stats) = self.stats.get(kind) {
            stats.update(ns);
            return;
        }
        self.stats.entry(kind.to_string()).or_default().update(ns);
    }

    /// Snapshot sorted by total time, slowest first
    pub fn report(&self) -> Vec<KindReport> {
        let mut rows: Vec<KindReport> = self
            .stats
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect();
        rows.sort_by(|a, b| b.total_ns.cmp(&a.total_ns).then_with(|| a.kind.cmp(&b.kind)));
        rows
    }

    pub fn get(&self, kind: &str) -> Option<KindReport> {
        self.stats.get(kind).map(|stats| stats.snapshot(kind))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "kinds": self.report() })
    }

    pub fn reset(&self) {
        self.stats.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

impl fmt::Display for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>10} {:>14} {:>12} {:>12} {:>12}",
            "kind", "count", "total_ms", "avg_us", "min_us", "max_us"
        )?;
        for row in self.report() {
            writeln!(
                f,
                "{:<12} {:>10} {:>14.3} {:>12.3} {:>12.3} {:>12.3}",
                row.kind,
                row.count,
                row.total_ns as f64 / 1_000_000.0,
                row.avg_ns as f64 / 1_000.0,
                row.min_ns as f64 / 1_000.0,
                row.max_ns as f64 / 1_000.0,
            )?;
        }
        Ok(())
    }
}
