use crate::dns::metrics::DnsMetrics;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strata_dns_application::ports::QueryEventSink;
use strata_dns_domain::config::QueryStoreConfig;
use strata_dns_domain::QueryEvent;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DRAIN_TICK: Duration = Duration::from_millis(250);
const RETRY_BASE: Duration = Duration::from_millis(500);

/// Bounded in-memory ring of query events.
///
/// `record` never blocks and never errors: a full buffer drops the incoming
/// event and counts it. Durability is explicitly not a goal; the columnar
/// store is best-effort analytics.
pub struct QueryStore {
    buffer: Mutex<VecDeque<QueryEvent>>,
    capacity: usize,
    recorded: AtomicU64,
    dropped: AtomicU64,
    metrics: Arc<DnsMetrics>,
}

impl QueryStore {
    pub fn new(capacity: usize, metrics: Arc<DnsMetrics>) -> Arc<Self> {
        Arc::new(Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(4_096))),
            capacity: capacity.max(1),
            recorded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            metrics,
        })
    }

    pub fn buffered(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Pop up to `max` events for a flush.
    pub fn drain(&self, max: usize) -> Vec<QueryEvent> {
        let mut buffer = self.buffer.lock().unwrap();
        let take = max.min(buffer.len());
        let drained: Vec<QueryEvent> = buffer.drain(..take).collect();
        self.metrics.querystore_buffer_used.set(buffer.len() as i64);
        drained
    }
}

impl QueryEventSink for QueryStore {
    fn record(&self, event: QueryEvent) {
        let mut buffer = self.buffer.lock().unwrap();
        if buffer.len() >= self.capacity {
            drop(buffer);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.metrics.querystore_dropped.inc();
            return;
        }
        buffer.push_back(event);
        let used = buffer.len();
        drop(buffer);
        self.recorded.fetch_add(1, Ordering::Relaxed);
        self.metrics.querystore_recorded.inc();
        self.metrics.querystore_buffer_used.set(used as i64);
    }
}

/// One analytics row in the columnar store's `dns_queries` table.
#[derive(Serialize)]
struct QueryRow<'a> {
    ts: String,
    client_ip: String,
    client_name: &'a str,
    group_id: &'a str,
    qname: &'a str,
    qtype: String,
    rcode: u8,
    duration_ms: u64,
    outcome: &'static str,
}

impl<'a> QueryRow<'a> {
    fn from_event(event: &'a QueryEvent) -> Self {
        Self {
            ts: event.ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            client_ip: event.client_ip.to_string(),
            client_name: &event.client_name,
            group_id: &event.group_id,
            qname: &event.qname,
            qtype: event.qtype.to_string(),
            rcode: event.rcode,
            duration_ms: event.duration_ms,
            outcome: event.outcome.as_str(),
        }
    }
}

/// Drains the buffer in batches (by count or by time) and POSTs them as
/// `JSONEachRow` to the store's HTTP insert endpoint.
pub struct QueryStoreDrain {
    store: Arc<QueryStore>,
    config: QueryStoreConfig,
    http: reqwest::Client,
}

impl QueryStoreDrain {
    pub fn new(store: Arc<QueryStore>, config: QueryStoreConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            store,
            config,
            http,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let flush_interval = Duration::from_secs(self.config.flush_interval_secs.max(1));
            let mut last_flush = Instant::now();
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        // Final best-effort flush on the way out.
                        self.flush_all().await;
                        debug!("Query store drain shutting down");
                        break;
                    }
                    _ = sleep(DRAIN_TICK) => {
                        let due = last_flush.elapsed() >= flush_interval;
                        if self.store.buffered() >= self.config.batch || (due && self.store.buffered() > 0) {
                            self.flush_all().await;
                            last_flush = Instant::now();
                        }
                    }
                }
            }
        })
    }

    async fn flush_all(&self) {
        loop {
            let batch = self.store.drain(self.config.batch.max(1));
            if batch.is_empty() {
                return;
            }
            self.flush_batch(&batch).await;
        }
    }

    /// Failed flushes back off exponentially; the batch is dropped after
    /// `max_attempts` (events are not durable by design).
    async fn flush_batch(&self, batch: &[QueryEvent]) {
        let mut payload = String::with_capacity(batch.len() * 160);
        for event in batch {
            match serde_json::to_string(&QueryRow::from_event(event)) {
                Ok(row) => {
                    payload.push_str(&row);
                    payload.push('\n');
                }
                Err(e) => warn!(error = %e, "Skipping unserializable query event"),
            }
        }
        if payload.is_empty() {
            return;
        }

        let mut backoff = RETRY_BASE;
        for attempt in 1..=self.config.max_attempts.max(1) {
            let result = self
                .http
                .post(&self.config.url)
                .body(payload.clone())
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(_) => {
                    debug!(rows = batch.len(), "Query store batch flushed");
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Query store flush failed");
                    if attempt < self.config.max_attempts {
                        sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        warn!(rows = batch.len(), "Dropping analytics batch after retries");
    }
}
