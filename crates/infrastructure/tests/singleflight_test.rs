use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::{UpstreamAnswer, UpstreamExchanger};
use strata_dns_domain::{CacheKey, Question, RecordType, ResolveError};
use strata_dns_infrastructure::dns::upstream::Singleflight;

/// Counts real exchanges; responds after a configurable delay so
/// concurrent callers overlap.
struct CountingUpstream {
    exchanges: AtomicU64,
    delay: Duration,
    fail: bool,
}

#[async_trait]
impl UpstreamExchanger for CountingUpstream {
    async fn exchange(
        &self,
        question: &Question,
        _budget: Duration,
    ) -> Result<UpstreamAnswer, ResolveError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(ResolveError::UpstreamNetwork("scripted failure".into()));
        }
        Ok(UpstreamAnswer {
            encoded: Bytes::from(question.name.as_bytes().to_vec()),
            rcode: 0,
            min_ttl: 60,
        })
    }
}

fn key(name: &str) -> CacheKey {
    CacheKey::new(Arc::from(name), RecordType::A, Arc::from("default"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_concurrent_misses_one_exchange() {
    let upstream = Arc::new(CountingUpstream {
        exchanges: AtomicU64::new(0),
        delay: Duration::from_millis(200),
        fail: false,
    });
    let flight = Arc::new(Singleflight::new(upstream.clone()));

    let mut handles = Vec::new();
    for _ in 0..100 {
        let flight = Arc::clone(&flight);
        handles.push(tokio::spawn(async move {
            flight
                .exchange(
                    &key("example.com"),
                    &Question::new("example.com", RecordType::A),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    let mut answers = Vec::new();
    for handle in handles {
        answers.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(upstream.exchanges.load(Ordering::SeqCst), 1);
    assert!(answers
        .iter()
        .all(|a| a.encoded == answers[0].encoded && a.min_ttl == 60));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_do_not_coalesce() {
    let upstream = Arc::new(CountingUpstream {
        exchanges: AtomicU64::new(0),
        delay: Duration::from_millis(50),
        fail: false,
    });
    let flight = Arc::new(Singleflight::new(upstream.clone()));

    let key_a = key("a.example.com");
    let question_a = Question::new("a.example.com", RecordType::A);
    let key_b = key("b.example.com");
    let question_b = Question::new("b.example.com", RecordType::A);
    let first = flight.exchange(&key_a, &question_a, Duration::from_secs(2));
    let second = flight.exchange(&key_b, &question_b, Duration::from_secs(2));
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    assert_eq!(upstream.exchanges.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_propagate_to_every_waiter() {
    let upstream = Arc::new(CountingUpstream {
        exchanges: AtomicU64::new(0),
        delay: Duration::from_millis(100),
        fail: true,
    });
    let flight = Arc::new(Singleflight::new(upstream.clone()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let flight = Arc::clone(&flight);
        handles.push(tokio::spawn(async move {
            flight
                .exchange(
                    &key("down.example.com"),
                    &Question::new("down.example.com", RecordType::A),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }
    assert_eq!(upstream.exchanges.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exchange_survives_a_cancelled_leader() {
    let upstream = Arc::new(CountingUpstream {
        exchanges: AtomicU64::new(0),
        delay: Duration::from_millis(150),
        fail: false,
    });
    let flight = Arc::new(Singleflight::new(upstream.clone()));

    // Leader joins first, then gets aborted mid-exchange.
    let leader = {
        let flight = Arc::clone(&flight);
        tokio::spawn(async move {
            flight
                .exchange(
                    &key("example.com"),
                    &Question::new("example.com", RecordType::A),
                    Duration::from_secs(2),
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let follower = {
        let flight = Arc::clone(&flight);
        tokio::spawn(async move {
            flight
                .exchange(
                    &key("example.com"),
                    &Question::new("example.com", RecordType::A),
                    Duration::from_secs(2),
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    leader.abort();

    let answer = follower.await.unwrap().unwrap();
    assert_eq!(answer.min_ttl, 60);
    assert_eq!(upstream.exchanges.load(Ordering::SeqCst), 1);
}
