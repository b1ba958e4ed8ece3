#[path = "../common/pipeline.rs"]
mod pipeline;

use pipeline::{build_request, first_a, PipelineBuilder};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use strata_dns_application::ports::SharedCacheStore;
use strata_dns_domain::{QueryOutcome, RecordType};

fn client() -> IpAddr {
    "192.168.1.10".parse().unwrap()
}

#[tokio::test]
async fn degraded_shared_cache_reads_as_miss() {
    let pipeline = PipelineBuilder::new().build().await;
    pipeline
        .upstream
        .answer("example.com", Ipv4Addr::new(93, 184, 216, 34), 300);

    let request = build_request("example.com", RecordType::A);
    pipeline.resolver.serve(&request, client()).await;

    // Shared cache goes down; the entry still lives in L0.
    pipeline.shared.set_degraded(true);
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::L0Hit);

    // With L0 gone too, the outage is absorbed as a plain miss: the query
    // goes upstream instead of failing.
    pipeline.l0.clear();
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Upstream);
    assert_eq!(
        first_a(&result.message),
        Some(Ipv4Addr::new(93, 184, 216, 34))
    );
}

#[tokio::test]
async fn upstream_outage_without_stale_is_servfail() {
    let pipeline = PipelineBuilder::new().build().await;
    pipeline.upstream.set_failing(true);

    let request = build_request("never-seen.example.com", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;

    assert_eq!(result.outcome, QueryOutcome::Error);
    assert_eq!(
        result.message.response_code(),
        hickory_proto::op::ResponseCode::ServFail
    );
    // The failure still produced an analytics event.
    let events = pipeline.store.drain(10);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, QueryOutcome::Error);
}

#[tokio::test]
async fn stale_is_not_served_past_the_window() {
    let pipeline = PipelineBuilder::new().build().await;
    pipeline
        .upstream
        .answer("a.test", Ipv4Addr::new(192, 0, 2, 7), 60);

    let request = build_request("a.test", RecordType::A);
    pipeline.resolver.serve(&request, client()).await;

    // Age the entry beyond original_ttl + serve_stale (default 3600).
    let key = strata_dns_domain::CacheKey::new(
        std::sync::Arc::from("a.test"),
        RecordType::A,
        std::sync::Arc::from("default"),
    );
    let cached = pipeline.l0.get(&key).unwrap();
    let ancient = strata_dns_domain::CacheEntry::new(
        cached.encoded.clone(),
        cached.original_ttl,
        cached.stored_at.saturating_sub(60 + 3_601),
        cached.rcode,
    );
    pipeline.l0.put(key.clone(), ancient.clone());
    pipeline
        .shared
        .put(key.shared_key(), ancient, Duration::from_secs(10_000));

    pipeline.upstream.set_failing(true);
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Error);
}

#[tokio::test]
async fn malformed_and_oversized_bytes_get_formerr() {
    let pipeline = PipelineBuilder::new().build().await;

    // Larger than any legal DNS message.
    let oversized = vec![0u8; 70_000];
    let response = pipeline.resolver.serve_bytes(&oversized, client()).await;
    let decoded = hickory_proto::op::Message::from_vec(&response).unwrap();
    assert_eq!(
        decoded.response_code(),
        hickory_proto::op::ResponseCode::FormErr
    );

    // A bare header with no question.
    let empty_header = vec![0u8; 12];
    let response = pipeline.resolver.serve_bytes(&empty_header, client()).await;
    let decoded = hickory_proto::op::Message::from_vec(&response).unwrap();
    assert_eq!(
        decoded.response_code(),
        hickory_proto::op::ResponseCode::FormErr
    );
}

#[tokio::test]
async fn nxdomain_is_a_cacheable_answer_not_an_error() {
    let pipeline = PipelineBuilder::new().build().await;
    // No scripted answer → upstream responds NXDOMAIN.

    let request = build_request("missing.example.com", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Upstream);
    assert_eq!(
        result.message.response_code(),
        hickory_proto::op::ResponseCode::NXDomain
    );

    // The negative answer was cached and is served from L0 next time.
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::L0Hit);
    assert_eq!(pipeline.upstream.exchanges(), 1);
}
