use std::sync::Arc;
use strata_dns_application::ports::{QueryEventSink, SharedCacheStore};
use strata_dns_application::services::policy::PolicyResolver;
use strata_dns_domain::{Config, QueryEvent};
use strata_dns_infrastructure::dns::analytics::{QueryStore, QueryStoreDrain};
use strata_dns_infrastructure::dns::block_filter::BlocklistEngine;
use strata_dns_infrastructure::dns::cache::L0Cache;
use strata_dns_infrastructure::dns::client_map::ClientMap;
use strata_dns_infrastructure::dns::local_records::LocalRecords;
use strata_dns_infrastructure::dns::metrics::DnsMetrics;
use strata_dns_infrastructure::dns::refresh::RefreshEngine;
use strata_dns_infrastructure::dns::resolver::{QueryResolver, ResolverParts};
use strata_dns_infrastructure::dns::shared_cache::{MemorySharedCache, RedisSharedCache};
use strata_dns_infrastructure::dns::trace::TraceGate;
use strata_dns_infrastructure::dns::upstream::{Singleflight, UpstreamClient};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Sink used when the query store is disabled.
struct NullSink;

impl QueryEventSink for NullSink {
    fn record(&self, _event: QueryEvent) {}
}

pub struct AppContext {
    pub resolver: Arc<QueryResolver>,
    pub refresh: Arc<RefreshEngine>,
    pub block_filter: Arc<BlocklistEngine>,
    pub metrics: Arc<DnsMetrics>,
    pub shutdown: CancellationToken,
}

/// Wire the whole engine from configuration. Ordering matters only in that
/// the blocklist compiles before the first query can arrive.
pub async fn build(config: &Config) -> anyhow::Result<AppContext> {
    let shutdown = CancellationToken::new();
    let metrics = DnsMetrics::new();
    let trace = Arc::new(TraceGate::new(&config.tracing.events));

    let l0 = Arc::new(L0Cache::new(
        config.cache.l0.size,
        config.cache.l0.max_bytes,
    ));

    // A shared cache that cannot even connect at startup must not block
    // serving: fall back to the in-process store and keep going.
    let shared: Arc<dyn SharedCacheStore> =
        match RedisSharedCache::connect(&config.cache.l1).await {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "Shared cache unreachable, falling back to in-process store");
                Arc::new(MemorySharedCache::new())
            }
        };

    let block_filter = Arc::new(BlocklistEngine::new()?);
    let groups = config.effective_groups();
    block_filter
        .apply_config(config.blocklist.clone(), groups.clone())
        .await?;

    let policy = Arc::new(PolicyResolver::new(block_filter.clone()));
    policy.apply_config(&groups);

    let client_map = Arc::new(ClientMap::new());
    client_map.apply_config(&config.clients);

    let local_records = Arc::new(LocalRecords::new());
    local_records.apply_config(&config.local_records);

    let upstream = Arc::new(UpstreamClient::new(&config.upstreams, &config.resolver)?);
    let singleflight = Arc::new(Singleflight::new(upstream));

    let refresh = RefreshEngine::new(
        Arc::clone(&l0),
        Arc::clone(&shared),
        Arc::clone(&singleflight),
        config.refresh.clone(),
        &config.cache.l1,
        Arc::clone(&metrics),
        Arc::clone(&trace),
    );
    refresh.spawn_workers(shutdown.clone());

    let sink: Arc<dyn QueryEventSink> = if config.query_store.enabled {
        let store = QueryStore::new(config.query_store.buffer_size, Arc::clone(&metrics));
        QueryStoreDrain::new(Arc::clone(&store), config.query_store.clone())
            .spawn(shutdown.clone());
        store
    } else {
        Arc::new(NullSink)
    };

    let resolver = QueryResolver::new(ResolverParts {
        client_map,
        local_records,
        policy,
        l0,
        shared,
        singleflight,
        refresh: Arc::clone(&refresh),
        sink,
        metrics: Arc::clone(&metrics),
        trace,
        resolver_config: config.resolver.clone(),
        cache_config: config.cache.clone(),
        blocklist_config: config.blocklist.clone(),
    });

    Ok(AppContext {
        resolver,
        refresh,
        block_filter,
        metrics,
        shutdown,
    })
}
