use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{cmd, FromRedisValue};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::SharedCacheStore;
use strata_dns_domain::config::{L1Config, L1Mode};
use strata_dns_domain::{CacheEntry, ResolveError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Hit counters live beside the entries under their own prefix so a key
/// scan for `dns:*` never returns them.
const HITS_PREFIX: &str = "hits:";
const HITS_EXPIRY_SECS: u64 = 86_400;

/// Probe cadence while degraded, and the backoff cap.
const PROBE_BASE: Duration = Duration::from_millis(500);
const PROBE_MAX: Duration = Duration::from_secs(30);

enum WriteOp {
    Set {
        key: String,
        value: Bytes,
        expiry_secs: u64,
    },
    Hit {
        key: String,
    },
}

#[derive(Clone)]
enum SharedConn {
    Standalone(ConnectionManager),
    Cluster(ClusterConnection),
}

impl SharedConn {
    async fn query<T: FromRedisValue>(&self, command: &redis::Cmd) -> redis::RedisResult<T> {
        match self {
            Self::Standalone(conn) => command.query_async(&mut conn.clone()).await,
            Self::Cluster(conn) => command.query_async(&mut conn.clone()).await,
        }
    }
}

/// Shared (L1) cache over redis: standalone, sentinel-discovered master, or
/// key-slot cluster behind one client.
///
/// Failure semantics: every operation on a degraded connection degrades to
/// a miss. A probe task PINGs with exponential backoff off the request path
/// and clears the flag once the store answers again.
pub struct RedisSharedCache {
    conn: SharedConn,
    degraded: AtomicBool,
    write_tx: mpsc::Sender<WriteOp>,
    dropped_writes: AtomicU64,
}

impl RedisSharedCache {
    /// Connect per the configured topology and start the writer and probe
    /// tasks.
    pub async fn connect(config: &L1Config) -> Result<Arc<Self>, ResolveError> {
        let conn = match config.mode {
            L1Mode::Standalone => Self::connect_standalone(&config.address).await?,
            L1Mode::Sentinel => {
                Self::connect_via_sentinel(&config.sentinel.master, &config.sentinel.nodes).await?
            }
            L1Mode::Cluster => Self::connect_cluster(&config.cluster.nodes).await?,
        };

        let (write_tx, write_rx) = mpsc::channel(config.write_queue.max(1));
        let store = Arc::new(Self {
            conn,
            degraded: AtomicBool::new(false),
            write_tx,
            dropped_writes: AtomicU64::new(0),
        });

        store.clone().spawn_writer(write_rx);
        store.clone().spawn_probe();
        info!(mode = ?config.mode, "Shared cache connected");
        Ok(store)
    }

    async fn connect_standalone(address: &str) -> Result<SharedConn, ResolveError> {
        let client = redis::Client::open(redis_url(address))
            .map_err(|e| ResolveError::CacheUnavailable(e.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| ResolveError::CacheUnavailable(e.to_string()))?;
        Ok(SharedConn::Standalone(manager))
    }

    /// Ask each sentinel in turn for the current master, then connect to it
    /// directly. `ConnectionManager` re-resolves on reconnect by retrying
    /// the same address; a failed-over master flips the store to degraded
    /// until the probe path reconnects.
    async fn connect_via_sentinel(
        master: &str,
        sentinels: &[String],
    ) -> Result<SharedConn, ResolveError> {
        for sentinel in sentinels {
            let client = match redis::Client::open(redis_url(sentinel)) {
                Ok(c) => c,
                Err(e) => {
                    warn!(sentinel = %sentinel, error = %e, "Sentinel address invalid");
                    continue;
                }
            };
            let mut conn = match client.get_multiplexed_async_connection().await {
                Ok(c) => c,
                Err(e) => {
                    warn!(sentinel = %sentinel, error = %e, "Sentinel unreachable");
                    continue;
                }
            };
            let addr: Option<(String, String)> = cmd("SENTINEL")
                .arg("get-master-addr-by-name")
                .arg(master)
                .query_async(&mut conn)
                .await
                .ok()
                .flatten();
            if let Some((host, port)) = addr {
                info!(master = %master, host = %host, port = %port, "Sentinel resolved master");
                return Self::connect_standalone(&format!("{}:{}", host, port)).await;
            }
        }
        Err(ResolveError::CacheUnavailable(format!(
            "no sentinel could resolve master '{}'",
            master
        )))
    }

    async fn connect_cluster(nodes: &[String]) -> Result<SharedConn, ResolveError> {
        let urls: Vec<String> = nodes.iter().map(|n| redis_url(n)).collect();
        let client = ClusterClient::new(urls)
            .map_err(|e| ResolveError::CacheUnavailable(e.to_string()))?;
        let conn = client
            .get_async_connection()
            .await
            .map_err(|e| ResolveError::CacheUnavailable(e.to_string()))?;
        Ok(SharedConn::Cluster(conn))
    }

    fn spawn_writer(self: Arc<Self>, mut rx: mpsc::Receiver<WriteOp>) {
        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                if self.degraded.load(Ordering::Relaxed) {
                    // Writes during an outage are not worth queueing up.
                    continue;
                }
                let result: redis::RedisResult<()> = match op {
                    WriteOp::Set {
                        key,
                        value,
                        expiry_secs,
                    } => {
                        self.conn
                            .query(
                                cmd("SET")
                                    .arg(&key)
                                    .arg(value.as_ref())
                                    .arg("EX")
                                    .arg(expiry_secs.max(1)),
                            )
                            .await
                    }
                    WriteOp::Hit { key } => {
                        let counter = format!("{}{}", HITS_PREFIX, key);
                        let incr: redis::RedisResult<i64> =
                            self.conn.query(cmd("INCR").arg(&counter)).await;
                        match incr {
                            Ok(_) => {
                                self.conn
                                    .query(cmd("EXPIRE").arg(&counter).arg(HITS_EXPIRY_SECS))
                                    .await
                            }
                            Err(e) => Err(e),
                        }
                    }
                };
                if let Err(e) = result {
                    warn!(error = %e, "Shared cache write failed, marking degraded");
                    self.degraded.store(true, Ordering::Relaxed);
                }
            }
        });
    }

    /// Off-path PING loop. Runs only while degraded; exponential backoff so
    /// a hard outage does not generate connection churn.
    fn spawn_probe(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut backoff = PROBE_BASE;
            loop {
                tokio::time::sleep(backoff).await;
                if !self.degraded.load(Ordering::Relaxed) {
                    backoff = PROBE_BASE;
                    continue;
                }
                let pong: redis::RedisResult<String> = self.conn.query(&cmd("PING")).await;
                match pong {
                    Ok(_) => {
                        info!("Shared cache recovered");
                        self.degraded.store(false, Ordering::Relaxed);
                        backoff = PROBE_BASE;
                    }
                    Err(e) => {
                        debug!(error = %e, backoff = ?backoff, "Shared cache still down");
                        backoff = (backoff * 2).min(PROBE_MAX);
                    }
                }
            }
        });
    }

    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SharedCacheStore for RedisSharedCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        if self.degraded.load(Ordering::Relaxed) {
            return None;
        }
        match self.conn.query::<Option<Vec<u8>>>(cmd("GET").arg(key)).await {
            Ok(Some(raw)) => CacheEntry::from_bytes(&raw),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Shared cache read failed, marking degraded");
                self.degraded.store(true, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: String, entry: CacheEntry, expiry: Duration) {
        let op = WriteOp::Set {
            key,
            value: entry.to_bytes(),
            expiry_secs: expiry.as_secs(),
        };
        if self.write_tx.try_send(op).is_err() {
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_hit(&self, key: &str) {
        let op = WriteOp::Hit {
            key: key.to_string(),
        };
        if self.write_tx.try_send(op).is_err() {
            self.dropped_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn hit_count(&self, key: &str) -> u64 {
        if self.degraded.load(Ordering::Relaxed) {
            return 0;
        }
        let counter = format!("{}{}", HITS_PREFIX, key);
        self.conn
            .query::<Option<u64>>(cmd("GET").arg(&counter))
            .await
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    async fn scan(&self, pattern: &str, limit: usize) -> Vec<String> {
        if self.degraded.load(Ordering::Relaxed) {
            return Vec::new();
        }
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let reply: redis::RedisResult<(u64, Vec<String>)> = self
                .conn
                .query(
                    cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(100),
                )
                .await;
            match reply {
                Ok((next, batch)) => {
                    keys.extend(batch);
                    if keys.len() >= limit || next == 0 {
                        keys.truncate(limit);
                        return keys;
                    }
                    cursor = next;
                }
                Err(e) => {
                    warn!(error = %e, "Shared cache scan failed, marking degraded");
                    self.degraded.store(true, Ordering::Relaxed);
                    return keys;
                }
            }
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> usize {
        let pattern = format!("{}*", prefix);
        let keys = self.scan(&pattern, usize::MAX).await;
        if keys.is_empty() {
            return 0;
        }
        let mut removed = 0;
        for chunk in keys.chunks(128) {
            let mut del = cmd("DEL");
            for key in chunk {
                del.arg(key);
            }
            match self.conn.query::<u64>(&del).await {
                Ok(n) => removed += n as usize,
                Err(e) => {
                    warn!(error = %e, "Shared cache delete failed");
                    break;
                }
            }
        }
        removed
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

/// Accept both bare `host:port` and full `redis://` forms in config.
fn redis_url(address: &str) -> String {
    if address.starts_with("redis://") || address.starts_with("rediss://") {
        address.to_string()
    } else {
        format!("redis://{}", address)
    }
}
