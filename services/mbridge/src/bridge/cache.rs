//! Per-channel metric cache with lazy TTL expiry

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::model::Metric;

/// Latest metric per register key
///
/// Expired entries stay stored but are never returned; only [`flush`]
/// removes anything.
///
/// [`flush`]: MetricCache::flush
#[derive(Debug)]
pub struct MetricCache {
    ttl: Duration,
    entries: RwLock<BTreeMap<String, Metric>>,
}

impl MetricCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh metric for `key`, if any
    pub fn get(&self, key: &str) -> Option<Metric> {
        let now = Utc::now();
        self.entries
            .read()
            .get(key)
            .filter(|m| !m.is_expired(self.ttl, now))
            .cloned()
    }

    /// Unconditional overwrite
    pub fn set(&self, metric: Metric) {
        self.entries.write().insert(metric.key.clone(), metric);
    }

    /// Fresh metrics ordered by key
    pub fn list(&self) -> Vec<Metric> {
        let now = Utc::now();
        self.entries
            .read()
            .values()
            .filter(|m| !m.is_expired(self.ttl, now))
            .cloned()
            .collect()
    }

    pub fn flush(&self) {
        self.entries.write().clear();
    }

    /// Stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
