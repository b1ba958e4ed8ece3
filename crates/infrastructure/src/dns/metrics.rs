use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Counter and gauge set exported in the pull-based text format.
///
/// Names are part of the external interface; dashboards key on them.
pub struct DnsMetrics {
    registry: Registry,

    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub l0_hits: IntCounter,
    pub l1_hits: IntCounter,
    pub queries_blocked: IntCounter,
    pub refresh_sweeps: IntCounter,
    pub querystore_recorded: IntCounter,
    pub querystore_dropped: IntCounter,

    pub cache_hit_rate: Gauge,
    pub l0_entries: IntGauge,
    pub refresh_last_sweep_count: IntGauge,
    pub querystore_buffer_used: IntGauge,
    pub l1_degraded: IntGauge,
}

impl DnsMetrics {
    pub fn new() -> Arc<Self> {
        let registry = Registry::new();

        let cache_hits =
            IntCounter::new("dns_cache_hits_total", "Responses served from any cache tier")
                .unwrap();
        let cache_misses =
            IntCounter::new("dns_cache_misses_total", "Queries that reached upstream").unwrap();
        let l0_hits =
            IntCounter::new("dns_l0_hits_total", "Responses served from the in-process cache")
                .unwrap();
        let l1_hits =
            IntCounter::new("dns_l1_hits_total", "Responses served from the shared cache")
                .unwrap();
        let queries_blocked =
            IntCounter::new("dns_queries_blocked_total", "Queries answered by policy block")
                .unwrap();
        let refresh_sweeps =
            IntCounter::new("dns_refresh_sweep_total", "Completed refresh sweeps").unwrap();
        let querystore_recorded = IntCounter::new(
            "dns_querystore_recorded_total",
            "Query events accepted into the analytics buffer",
        )
        .unwrap();
        let querystore_dropped = IntCounter::new(
            "dns_querystore_dropped_total",
            "Query events dropped because the buffer was full",
        )
        .unwrap();

        let cache_hit_rate =
            Gauge::new("dns_cache_hit_rate", "Rolling cache hit rate, 0..1").unwrap();
        let l0_entries =
            IntGauge::new("dns_l0_entries", "Entries currently held by the in-process cache")
                .unwrap();
        let refresh_last_sweep_count = IntGauge::new(
            "dns_refresh_last_sweep_count",
            "Keys refreshed by the most recent sweep",
        )
        .unwrap();
        let querystore_buffer_used = IntGauge::new(
            "dns_querystore_buffer_used",
            "Query events waiting in the analytics buffer",
        )
        .unwrap();
        let l1_degraded = IntGauge::new(
            "dns_l1_degraded",
            "1 while the shared cache is treated as unavailable",
        )
        .unwrap();

        for collector in [
            Box::new(cache_hits.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(cache_misses.clone()),
            Box::new(l0_hits.clone()),
            Box::new(l1_hits.clone()),
            Box::new(queries_blocked.clone()),
            Box::new(refresh_sweeps.clone()),
            Box::new(querystore_recorded.clone()),
            Box::new(querystore_dropped.clone()),
            Box::new(cache_hit_rate.clone()),
            Box::new(l0_entries.clone()),
            Box::new(refresh_last_sweep_count.clone()),
            Box::new(querystore_buffer_used.clone()),
            Box::new(l1_degraded.clone()),
        ] {
            registry.register(collector).unwrap();
        }

        Arc::new(Self {
            registry,
            cache_hits,
            cache_misses,
            l0_hits,
            l1_hits,
            queries_blocked,
            refresh_sweeps,
            querystore_recorded,
            querystore_dropped,
            cache_hit_rate,
            l0_entries,
            refresh_last_sweep_count,
            querystore_buffer_used,
            l1_degraded,
        })
    }

    /// Recompute the derived hit-rate gauge from the counters.
    pub fn update_hit_rate(&self) {
        let hits = self.cache_hits.get();
        let total = hits + self.cache_misses.get();
        if total > 0 {
            self.cache_hit_rate.set(hits as f64 / total as f64);
        }
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn gather_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
