use lru::LruCache;
use rustc_hash::{FxBuildHasher, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use strata_dns_domain::{CacheEntry, CacheKey};
use tracing::{debug, info};

/// Fixed shard count. Shard selection hashes the full key, so contention
/// spreads across locks without any coordination.
const SHARDS: usize = 16;

#[derive(Debug, Default)]
pub struct L0Stats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub insertions: AtomicU64,
}

struct Shard {
    map: LruCache<CacheKey, CacheEntry, FxBuildHasher>,
    bytes: usize,
}

/// Process-local cache of encoded responses: strict LRU, bounded by entry
/// count and by byte size, split into fixed shards.
///
/// Readers and writers to distinct shards never contend; within a shard the
/// lock is held only for the map operation itself.
pub struct L0Cache {
    shards: Vec<Mutex<Shard>>,
    max_entries_per_shard: usize,
    max_bytes_per_shard: usize,
    stats: L0Stats,
}

impl L0Cache {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        let max_entries_per_shard = (max_entries / SHARDS).max(1);
        let max_bytes_per_shard = (max_bytes / SHARDS).max(1);
        info!(
            max_entries = max_entries,
            max_bytes = max_bytes,
            shards = SHARDS,
            "Initializing L0 cache"
        );
        let shards = (0..SHARDS)
            .map(|_| {
                Mutex::new(Shard {
                    map: LruCache::unbounded_with_hasher(FxBuildHasher),
                    bytes: 0,
                })
            })
            .collect();
        Self {
            shards,
            max_entries_per_shard,
            max_bytes_per_shard,
            stats: L0Stats::default(),
        }
    }

    #[inline]
    fn shard_for(&self, key: &CacheKey) -> &Mutex<Shard> {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARDS]
    }

    /// Returns the entry regardless of freshness; the caller decides
    /// between fresh serve, stale serve, and miss from the entry's TTL.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut shard = self.shard_for(key).lock().unwrap();
        match shard.map.get(key) {
            Some(entry) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert, evicting strict-LRU until both shard bounds hold again.
    pub fn put(&self, key: CacheKey, entry: CacheEntry) {
        let size = entry.approx_size();
        let mut shard = self.shard_for(&key).lock().unwrap();

        if let Some(old) = shard.map.put(key, entry) {
            shard.bytes -= old.approx_size();
        }
        shard.bytes += size;
        self.stats.insertions.fetch_add(1, Ordering::Relaxed);

        while shard.map.len() > self.max_entries_per_shard
            || shard.bytes > self.max_bytes_per_shard
        {
            match shard.map.pop_lru() {
                Some((evicted_key, evicted)) => {
                    shard.bytes -= evicted.approx_size();
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(name = %evicted_key.name, "L0 eviction");
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap().map.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap();
            shard.map.clear();
            shard.bytes = 0;
        }
        info!("L0 cache cleared");
    }

    pub fn stats(&self) -> &L0Stats {
        &self.stats
    }
}
