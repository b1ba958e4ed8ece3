use crate::dns::cache::coarse_clock::coarse_now_secs;
use crate::dns::cache::L0Cache;
use crate::dns::metrics::DnsMetrics;
use crate::dns::trace::{events, TraceGate};
use crate::dns::upstream::Singleflight;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::SharedCacheStore;
use strata_dns_domain::config::{L1Config, RefreshConfig};
use strata_dns_domain::{CacheEntry, CacheKey, Question, ResolveError};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Keeps popular shared-cache entries fresh without touching client
/// responses.
///
/// Two feeds share the same refresh operation: the periodic sweeper (scan
/// L1 for entries near expiry, hottest first) and the hot-path hint channel
/// (a cache hit below the refresh threshold enqueues its key; a full
/// channel silently drops the hint and the sweeper catches it later).
pub struct RefreshEngine {
    l0: Arc<L0Cache>,
    shared: Arc<dyn SharedCacheStore>,
    singleflight: Arc<Singleflight>,
    config: RefreshConfig,
    /// Floor for the store-side expiry of rewritten entries.
    ttl_floor: u64,
    /// Pad added to the store expiry so expired entries stay available for
    /// stale serving.
    serve_stale_secs: u64,
    metrics: Arc<DnsMetrics>,
    trace: Arc<TraceGate>,
    hint_tx: mpsc::Sender<CacheKey>,
    hint_rx: Mutex<Option<mpsc::Receiver<CacheKey>>>,
    dropped_hints: AtomicU64,
}

impl RefreshEngine {
    pub fn new(
        l0: Arc<L0Cache>,
        shared: Arc<dyn SharedCacheStore>,
        singleflight: Arc<Singleflight>,
        config: RefreshConfig,
        l1: &L1Config,
        metrics: Arc<DnsMetrics>,
        trace: Arc<TraceGate>,
    ) -> Arc<Self> {
        let (hint_tx, hint_rx) = mpsc::channel(config.queue.max(1));
        Arc::new(Self {
            l0,
            shared,
            singleflight,
            config,
            ttl_floor: l1.ttl_default,
            serve_stale_secs: l1.serve_stale,
            metrics,
            trace,
            hint_tx,
            hint_rx: Mutex::new(Some(hint_rx)),
            dropped_hints: AtomicU64::new(0),
        })
    }

    /// Whether an entry is close enough to expiry to be worth refreshing.
    pub fn needs_refresh(&self, entry: &CacheEntry, now: u64) -> bool {
        let threshold = (entry.original_ttl as u64 * self.config.threshold_pct as u64 / 100)
            .max(self.config.min_threshold_secs as u64);
        (entry.remaining_ttl(now) as u64) < threshold
    }

    /// Hot-path trigger; never blocks.
    pub fn hint(&self, key: &CacheKey) {
        if self.hint_tx.try_send(key.clone()).is_err() {
            self.dropped_hints.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_hints(&self) -> u64 {
        self.dropped_hints.load(Ordering::Relaxed)
    }

    /// Hints waiting for a worker. Zero once the pool has drained them.
    pub fn pending_hints(&self) -> usize {
        self.config.queue.max(1) - self.hint_tx.capacity()
    }

    /// Re-query a key directly against upstream (bypassing the cache read
    /// path) and write L1 then L0 on success.
    pub async fn refresh_key(&self, key: &CacheKey) -> Result<(), ResolveError> {
        let question = Question::from_normalized(Arc::clone(&key.name), key.qtype);
        let budget = Duration::from_millis(self.config.exchange_timeout_ms);
        let answer = self.singleflight.exchange(key, &question, budget).await?;

        let entry = CacheEntry::new(
            answer.encoded,
            answer.min_ttl,
            coarse_now_secs(),
            answer.rcode,
        );
        let expiry = Duration::from_secs(
            (answer.min_ttl as u64).max(self.ttl_floor) + self.serve_stale_secs,
        );
        self.shared.put(key.shared_key(), entry.clone(), expiry);
        self.l0.put(key.clone(), entry);

        if self.trace.enabled(events::REFRESH) {
            debug!(name = %key.name, qtype = %key.qtype, group = %key.group, "Entry refreshed");
        }
        Ok(())
    }

    /// One sweep: scan L1 for near-expiry entries, hottest keys first,
    /// bounded to `max_per_sweep`. Returns the number refreshed.
    pub async fn sweep_once(&self) -> usize {
        let keys = self.shared.scan("dns:*", self.config.max_per_sweep).await;
        let now = coarse_now_secs();

        let mut candidates: Vec<(CacheKey, u64)> = Vec::new();
        for raw_key in keys {
            let key = match CacheKey::from_shared_key(&raw_key) {
                Some(key) => key,
                None => continue,
            };
            let entry = match self.shared.get(&raw_key).await {
                Some(entry) => entry,
                None => continue,
            };
            if self.needs_refresh(&entry, now) {
                let hits = self.shared.hit_count(&raw_key).await;
                candidates.push((key, hits));
            }
        }

        // Popularity bias: refresh the most-read keys first so budget
        // pressure starves the cold tail, not the hot set.
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        let mut refreshed = 0;
        for (key, _) in candidates {
            match self.refresh_key(&key).await {
                Ok(()) => refreshed += 1,
                Err(e) => {
                    debug!(name = %key.name, error = %e, "Sweep refresh failed");
                }
            }
        }

        self.metrics.refresh_sweeps.inc();
        self.metrics.refresh_last_sweep_count.set(refreshed as i64);
        refreshed
    }

    /// Start the hint worker pool. Workers share one receiver and perform
    /// the same refresh operation the sweeper uses.
    pub fn spawn_workers(self: &Arc<Self>, shutdown: CancellationToken) {
        let receiver = Arc::new(Mutex::new(
            self.hint_rx
                .try_lock()
                .ok()
                .and_then(|mut slot| slot.take())
                .expect("refresh workers already started"),
        ));

        for worker in 0..self.config.workers.max(1) {
            let engine = Arc::clone(self);
            let receiver = Arc::clone(&receiver);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let key = {
                        let mut rx = receiver.lock().await;
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            key = rx.recv() => match key {
                                Some(key) => key,
                                None => break,
                            },
                        }
                    };
                    if let Err(e) = engine.refresh_key(&key).await {
                        warn!(worker, name = %key.name, error = %e, "Hint refresh failed");
                    }
                }
                debug!(worker, "Refresh worker stopped");
            });
        }
    }
}
