use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::{UpstreamAnswer, UpstreamExchanger};
use strata_dns_domain::{CacheKey, Question, ResolveError};
use tokio::sync::broadcast;
use tracing::debug;

type ExchangeResult = Result<UpstreamAnswer, ResolveError>;

/// Coalesces concurrent identical misses into one upstream exchange.
///
/// The first caller for a key becomes the leader and spawns the exchange as
/// its own task; everyone (leader included) awaits the broadcast result.
/// Because the exchange runs detached, a cancelled leader does not abort
/// the work its followers are waiting on; the exchange runs to completion
/// or budget exhaustion regardless.
pub struct Singleflight {
    inner: Arc<dyn UpstreamExchanger>,
    inflight: Arc<DashMap<CacheKey, broadcast::Sender<ExchangeResult>, FxBuildHasher>>,
}

impl Singleflight {
    pub fn new(inner: Arc<dyn UpstreamExchanger>) -> Self {
        Self {
            inner,
            inflight: Arc::new(DashMap::with_hasher(FxBuildHasher)),
        }
    }

    /// At most one in-flight exchange exists per `key` at any moment.
    pub async fn exchange(
        &self,
        key: &CacheKey,
        question: &Question,
        budget: Duration,
    ) -> ExchangeResult {
        loop {
            let mut rx = match self.inflight.entry(key.clone()) {
                Entry::Occupied(existing) => {
                    debug!(name = %key.name, "Joining in-flight exchange");
                    existing.get().subscribe()
                }
                Entry::Vacant(slot) => {
                    let (tx, rx) = broadcast::channel(1);
                    slot.insert(tx.clone());

                    let inner = Arc::clone(&self.inner);
                    let inflight = Arc::clone(&self.inflight);
                    let question = question.clone();
                    let leader_key = key.clone();
                    tokio::spawn(async move {
                        let result = inner.exchange(&question, budget).await;
                        // Remove before sending so a late joiner that finds
                        // no entry starts fresh instead of waiting on a
                        // channel that already fired.
                        inflight.remove(&leader_key);
                        let _ = tx.send(result);
                    });
                    rx
                }
            };

            match tokio::time::timeout(budget, rx.recv()).await {
                Ok(Ok(result)) => return result,
                Ok(Err(_)) => {
                    // The sender fired before we subscribed; the entry is
                    // gone, so retry and become the new leader.
                    continue;
                }
                Err(_) => return Err(ResolveError::UpstreamTimeout(budget)),
            }
        }
    }
}
