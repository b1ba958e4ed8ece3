use strata_dns_domain::QueryEvent;

/// Analytics intake. `record` must not block: implementations buffer and
/// drop under pressure rather than slow the query path.
pub trait QueryEventSink: Send + Sync {
    fn record(&self, event: QueryEvent);
}
