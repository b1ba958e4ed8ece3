#[path = "../common/pipeline.rs"]
mod pipeline;

use pipeline::{build_request, first_a, group, PipelineBuilder};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::SharedCacheStore;
use strata_dns_domain::{CacheEntry, CacheKey, QueryOutcome, RecordType};

fn client() -> IpAddr {
    "192.168.1.10".parse().unwrap()
}

#[tokio::test]
async fn local_record_is_authoritative() {
    let pipeline = PipelineBuilder::new()
        .with_local_record("router.lan", RecordType::A, "10.0.0.1")
        .build()
        .await;

    let request = build_request("router.lan", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;

    assert_eq!(result.outcome, QueryOutcome::Local);
    assert!(result.message.authoritative());
    assert_eq!(first_a(&result.message), Some(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(result.message.answers()[0].ttl(), 3_600);
    // Local answers never consult upstream.
    assert_eq!(pipeline.upstream.exchanges(), 0);
}

#[tokio::test]
async fn blocked_query_gets_unspecified_address() {
    let pipeline = PipelineBuilder::new()
        .with_denylist(&["ads.example.com"])
        .build()
        .await;

    let request = build_request("ads.example.com", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;

    assert_eq!(result.outcome, QueryOutcome::Blocked);
    assert_eq!(first_a(&result.message), Some(Ipv4Addr::UNSPECIFIED));
    assert_eq!(pipeline.metrics.queries_blocked.get(), 1);
    // Blocked queries never reach upstream and never populate cache.
    assert_eq!(pipeline.upstream.exchanges(), 0);
    assert_eq!(pipeline.l0.len(), 0);
    assert!(pipeline.shared.is_empty());
}

#[tokio::test]
async fn local_record_shadows_blocklist() {
    let pipeline = PipelineBuilder::new()
        .with_denylist(&["printer.lan"])
        .with_local_record("printer.lan", RecordType::A, "10.0.0.9")
        .build()
        .await;

    let request = build_request("printer.lan", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;

    assert_eq!(result.outcome, QueryOutcome::Local);
    assert_eq!(first_a(&result.message), Some(Ipv4Addr::new(10, 0, 0, 9)));
}

#[tokio::test]
async fn group_allowlist_overrides_global_blocklist() {
    let mut kids = group("kids");
    kids.allowlist = vec!["good.example.com".into()];

    let pipeline = PipelineBuilder::new()
        .with_denylist(&["good.example.com"])
        .with_group(kids)
        .with_client("192.168.1.10", Some("tablet"), Some("kids"))
        .build()
        .await;
    pipeline
        .upstream
        .answer("good.example.com", Ipv4Addr::new(93, 184, 216, 34), 300);

    // The kids client resolves upstream.
    let request = build_request("good.example.com", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Upstream);
    assert_eq!(
        first_a(&result.message),
        Some(Ipv4Addr::new(93, 184, 216, 34))
    );

    // Everyone else is still blocked.
    let other: IpAddr = "192.168.1.99".parse().unwrap();
    let result = pipeline.resolver.serve(&request, other).await;
    assert_eq!(result.outcome, QueryOutcome::Blocked);
}

#[tokio::test]
async fn cache_tiers_in_order() {
    let pipeline = PipelineBuilder::new().build().await;
    pipeline
        .upstream
        .answer("example.com", Ipv4Addr::new(93, 184, 216, 34), 60);

    let request = build_request("example.com", RecordType::A);

    // Cold: upstream, writes L1 then L0.
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Upstream);
    assert_eq!(pipeline.upstream.exchanges(), 1);
    assert_eq!(pipeline.l0.len(), 1);
    assert_eq!(pipeline.shared.len(), 1);

    // Warm: L0, TTL no higher than stored.
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::L0Hit);
    assert!(result.message.answers()[0].ttl() <= 60);
    assert!(result.message.answers()[0].ttl() > 0);
    assert_eq!(pipeline.upstream.exchanges(), 1);

    // After L0 clear: L1 hit, and L0 is repopulated.
    pipeline.l0.clear();
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::L1Hit);
    assert_eq!(pipeline.l0.len(), 1);
    assert_eq!(pipeline.upstream.exchanges(), 1);

    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::L0Hit);
    assert_eq!(pipeline.metrics.l0_hits.get(), 2);
    assert_eq!(pipeline.metrics.l1_hits.get(), 1);
}

#[tokio::test]
async fn groups_have_isolated_cache_entries() {
    let pipeline = PipelineBuilder::new()
        .with_group(group("kids"))
        .with_client("192.168.1.10", None, Some("kids"))
        .build()
        .await;
    pipeline
        .upstream
        .answer("example.com", Ipv4Addr::new(93, 184, 216, 34), 300);

    let request = build_request("example.com", RecordType::A);

    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Upstream);

    // A different group's identical question is a miss, not a hit.
    let other: IpAddr = "192.168.1.99".parse().unwrap();
    let result = pipeline.resolver.serve(&request, other).await;
    assert_eq!(result.outcome, QueryOutcome::Upstream);
    assert_eq!(pipeline.upstream.exchanges(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_coalesce_into_one_exchange() {
    let pipeline = PipelineBuilder::new()
        .with_upstream_delay(Duration::from_millis(200))
        .build()
        .await;
    pipeline
        .upstream
        .answer("example.com", Ipv4Addr::new(93, 184, 216, 34), 300);

    let mut handles = Vec::new();
    for _ in 0..100 {
        let resolver = Arc::clone(&pipeline.resolver);
        handles.push(tokio::spawn(async move {
            let request = build_request("example.com", RecordType::A);
            resolver.serve(&request, "192.168.1.10".parse().unwrap()).await
        }));
    }

    let mut addrs = Vec::new();
    for handle in handles {
        let result = handle.await.unwrap();
        addrs.push(first_a(&result.message).unwrap());
    }

    assert_eq!(pipeline.upstream.exchanges(), 1);
    assert!(addrs.iter().all(|a| *a == addrs[0]));
}

#[tokio::test]
async fn stale_entry_served_during_outage() {
    let pipeline = PipelineBuilder::new().build().await;
    pipeline
        .upstream
        .answer("a.test", Ipv4Addr::new(192, 0, 2, 7), 60);

    let request = build_request("a.test", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Upstream);

    // Age the cached entry past its TTL in both tiers.
    let key = CacheKey::new(Arc::from("a.test"), RecordType::A, Arc::from("default"));
    let cached = pipeline.l0.get(&key).unwrap();
    let aged = CacheEntry::new(
        cached.encoded.clone(),
        cached.original_ttl,
        cached.stored_at - 61,
        cached.rcode,
    );
    pipeline.l0.put(key.clone(), aged.clone());
    pipeline
        .shared
        .put(key.shared_key(), aged, Duration::from_secs(3_600));

    pipeline.upstream.set_failing(true);
    let result = pipeline.resolver.serve(&request, client()).await;

    assert_eq!(result.outcome, QueryOutcome::Stale);
    assert_eq!(first_a(&result.message), Some(Ipv4Addr::new(192, 0, 2, 7)));
    // A background refresh was enqueued for the stale key.
    assert!(pipeline.refresh.pending_hints() >= 1);
}

#[tokio::test]
async fn safe_search_rewrites_transparently_and_caches_under_original() {
    let mut kids = group("kids");
    kids.safe_search.google = true;

    let pipeline = PipelineBuilder::new()
        .with_group(kids)
        .with_client("192.168.1.10", None, Some("kids"))
        .build()
        .await;
    pipeline.upstream.answer(
        "forcesafesearch.google.com",
        Ipv4Addr::new(216, 239, 38, 120),
        300,
    );

    let request = build_request("www.google.com", RecordType::A);
    let result = pipeline.resolver.serve(&request, client()).await;

    assert_eq!(result.outcome, QueryOutcome::Upstream);
    assert_eq!(
        first_a(&result.message),
        Some(Ipv4Addr::new(216, 239, 38, 120))
    );
    // The question is echoed unchanged.
    assert_eq!(
        result.message.queries()[0].name().to_utf8(),
        request.queries()[0].name().to_utf8()
    );
    // The entry is keyed under the original question, not the rewrite.
    let original = CacheKey::new(Arc::from("www.google.com"), RecordType::A, Arc::from("kids"));
    assert!(pipeline.l0.get(&original).is_some());
}

#[tokio::test]
async fn analytics_events_follow_outcomes() {
    let pipeline = PipelineBuilder::new()
        .with_denylist(&["ads.example.com"])
        .build()
        .await;
    pipeline
        .upstream
        .answer("example.com", Ipv4Addr::new(93, 184, 216, 34), 300);

    pipeline
        .resolver
        .serve(&build_request("example.com", RecordType::A), client())
        .await;
    pipeline
        .resolver
        .serve(&build_request("ads.example.com", RecordType::A), client())
        .await;

    let events = pipeline.store.drain(10);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].outcome, QueryOutcome::Upstream);
    assert_eq!(&*events[0].qname, "example.com");
    assert_eq!(events[1].outcome, QueryOutcome::Blocked);
    assert_eq!(&*events[1].group_id, "default");
}

#[tokio::test]
async fn multi_question_requests_are_formerr() {
    let pipeline = PipelineBuilder::new().build().await;

    let mut request = build_request("example.com", RecordType::A);
    let extra = build_request("other.example.com", RecordType::A).queries()[0].clone();
    request.add_query(extra);

    let result = pipeline.resolver.serve(&request, client()).await;
    assert_eq!(result.outcome, QueryOutcome::Error);
    assert_eq!(
        result.message.response_code(),
        hickory_proto::op::ResponseCode::FormErr
    );
}
