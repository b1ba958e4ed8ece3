use async_trait::async_trait;
use std::time::Duration;
use strata_dns_domain::CacheEntry;

/// The shared (L1) cache. An outage must never become a request outage:
/// reads on a degraded store return `None`, writes are queued
/// fire-and-forget and dropped when the queue is full.
#[async_trait]
pub trait SharedCacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Enqueue a write. Returns immediately; a full queue drops the write
    /// and counts it.
    fn put(&self, key: String, entry: CacheEntry, expiry: Duration);

    /// Promote an L0 hit into shared popularity metadata so the refresh
    /// sweeper can prioritize hot keys.
    fn record_hit(&self, key: &str);

    async fn hit_count(&self, key: &str) -> u64;

    /// Keys matching `pattern`, bounded to `limit`. Used only by the
    /// refresh sweeper.
    async fn scan(&self, pattern: &str, limit: usize) -> Vec<String>;

    async fn delete_prefix(&self, prefix: &str) -> usize;

    fn is_degraded(&self) -> bool;
}
