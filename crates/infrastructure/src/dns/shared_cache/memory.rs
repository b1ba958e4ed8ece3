use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use strata_dns_application::ports::SharedCacheStore;
use strata_dns_domain::CacheEntry;

/// In-process stand-in for the shared cache. Single-node deployments that
/// run without redis use it, and every test that exercises the pipeline
/// builds on it.
#[derive(Default)]
pub struct MemorySharedCache {
    entries: DashMap<String, (CacheEntry, Instant)>,
    hits: DashMap<String, u64>,
    degraded: AtomicBool,
    dropped_writes: AtomicU64,
}

impl MemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the degraded flag; tests use this to simulate an outage.
    pub fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SharedCacheStore for MemorySharedCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        if self.degraded.load(Ordering::Relaxed) {
            return None;
        }
        let guard = self.entries.get(key)?;
        let (entry, expires) = guard.value();
        if Instant::now() >= *expires {
            drop(guard);
            self.entries.remove(key);
            return None;
        }
        Some(entry.clone())
    }

    fn put(&self, key: String, entry: CacheEntry, expiry: Duration) {
        if self.degraded.load(Ordering::Relaxed) {
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.entries.insert(key, (entry, Instant::now() + expiry));
    }

    fn record_hit(&self, key: &str) {
        *self.hits.entry(key.to_string()).or_insert(0) += 1;
    }

    async fn hit_count(&self, key: &str) -> u64 {
        self.hits.get(key).map(|v| *v).unwrap_or(0)
    }

    async fn scan(&self, pattern: &str, limit: usize) -> Vec<String> {
        if self.degraded.load(Ordering::Relaxed) {
            return Vec::new();
        }
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .take(limit)
            .map(|e| e.key().clone())
            .collect()
    }

    async fn delete_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}
