use chrono::Utc;
use std::sync::Arc;
use strata_dns_application::ports::QueryEventSink;
use strata_dns_domain::{QueryEvent, QueryOutcome, RecordType};
use strata_dns_infrastructure::dns::analytics::QueryStore;
use strata_dns_infrastructure::dns::metrics::DnsMetrics;

fn event(qname: &str) -> QueryEvent {
    QueryEvent {
        ts: Utc::now(),
        client_ip: "192.168.1.10".parse().unwrap(),
        client_name: Arc::from("laptop"),
        group_id: Arc::from("default"),
        qname: Arc::from(qname),
        qtype: RecordType::A,
        rcode: 0,
        duration_ms: 3,
        outcome: QueryOutcome::Upstream,
    }
}

#[test]
fn full_buffer_drops_and_counts() {
    let store = QueryStore::new(4, DnsMetrics::new());
    for i in 0..6 {
        store.record(event(&format!("q{}.example.com", i)));
    }

    assert_eq!(store.recorded(), 4);
    assert_eq!(store.dropped(), 2);
    assert_eq!(store.buffered(), 4);
    // Accounting closes: dropped == offered − accepted.
    assert_eq!(store.dropped(), 6 - store.recorded());
}

#[test]
fn drain_preserves_arrival_order_and_frees_space() {
    let store = QueryStore::new(8, DnsMetrics::new());
    for i in 0..5 {
        store.record(event(&format!("q{}.example.com", i)));
    }

    let drained = store.drain(3);
    assert_eq!(drained.len(), 3);
    assert_eq!(&*drained[0].qname, "q0.example.com");
    assert_eq!(&*drained[2].qname, "q2.example.com");
    assert_eq!(store.buffered(), 2);

    store.record(event("late.example.com"));
    assert_eq!(store.buffered(), 3);
}

#[test]
fn drain_more_than_buffered_takes_everything() {
    let store = QueryStore::new(8, DnsMetrics::new());
    store.record(event("only.example.com"));
    let drained = store.drain(100);
    assert_eq!(drained.len(), 1);
    assert_eq!(store.buffered(), 0);
}
