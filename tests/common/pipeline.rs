//! In-process pipeline harness: the full resolver wired against a scripted
//! upstream and the in-memory shared cache.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::{SharedCacheStore, UpstreamAnswer, UpstreamExchanger};
use strata_dns_application::services::policy::PolicyResolver;
use strata_dns_domain::config::{
    BlocklistConfig, CacheConfig, ClientConfig, ClientGroupConfig, LocalRecordConfig,
    RefreshConfig, ResolverConfig,
};
use strata_dns_domain::{Question, RecordType, ResolveError};
use strata_dns_infrastructure::dns::analytics::QueryStore;
use strata_dns_infrastructure::dns::block_filter::BlocklistEngine;
use strata_dns_infrastructure::dns::cache::L0Cache;
use strata_dns_infrastructure::dns::client_map::ClientMap;
use strata_dns_infrastructure::dns::local_records::LocalRecords;
use strata_dns_infrastructure::dns::metrics::DnsMetrics;
use strata_dns_infrastructure::dns::refresh::RefreshEngine;
use strata_dns_infrastructure::dns::resolver::{QueryResolver, ResolverParts};
use strata_dns_infrastructure::dns::shared_cache::MemorySharedCache;
use strata_dns_infrastructure::dns::trace::TraceGate;
use strata_dns_infrastructure::dns::upstream::Singleflight;

/// Upstream double: answers from a scripted name → address table, counts
/// exchanges, and can be flipped into failure mode.
pub struct ScriptedUpstream {
    answers: DashMap<String, (Ipv4Addr, u32)>,
    exchanges: AtomicU64,
    failing: AtomicBool,
    delay: Duration,
}

impl ScriptedUpstream {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answers: DashMap::new(),
            exchanges: AtomicU64::new(0),
            failing: AtomicBool::new(false),
            delay,
        })
    }

    pub fn answer(&self, name: &str, addr: Ipv4Addr, ttl: u32) {
        self.answers.insert(name.to_string(), (addr, ttl));
    }

    pub fn exchanges(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn encode_answer(name: &str, addr: Ipv4Addr, ttl: u32) -> Bytes {
        let qname = Name::from_str(name).unwrap();
        let mut query = Query::new();
        query.set_name(qname.clone());
        query.set_query_type(hickory_proto::rr::RecordType::A);

        let mut message = Message::new(4242, MessageType::Response, OpCode::Query);
        message.add_query(query);
        message.add_answer(Record::from_rdata(qname, ttl, RData::A(A(addr))));
        Bytes::from(message.to_vec().unwrap())
    }

    fn encode_nxdomain(name: &str) -> Bytes {
        let qname = Name::from_str(name).unwrap();
        let mut query = Query::new();
        query.set_name(qname);
        query.set_query_type(hickory_proto::rr::RecordType::A);

        let mut message = Message::new(4242, MessageType::Response, OpCode::Query);
        message.set_response_code(ResponseCode::NXDomain);
        message.add_query(query);
        Bytes::from(message.to_vec().unwrap())
    }
}

#[async_trait]
impl UpstreamExchanger for ScriptedUpstream {
    async fn exchange(
        &self,
        question: &Question,
        _budget: Duration,
    ) -> Result<UpstreamAnswer, ResolveError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ResolveError::UpstreamNetwork("scripted outage".into()));
        }
        match self.answers.get(question.name.as_ref()) {
            Some(entry) => {
                let (addr, ttl) = *entry;
                Ok(UpstreamAnswer {
                    encoded: Self::encode_answer(&question.name, addr, ttl),
                    rcode: 0,
                    min_ttl: ttl,
                })
            }
            None => Ok(UpstreamAnswer {
                encoded: Self::encode_nxdomain(&question.name),
                rcode: ResponseCode::NXDomain.low(),
                min_ttl: 30,
            }),
        }
    }
}

pub struct TestPipeline {
    pub resolver: Arc<QueryResolver>,
    pub upstream: Arc<ScriptedUpstream>,
    pub l0: Arc<L0Cache>,
    pub shared: Arc<MemorySharedCache>,
    pub refresh: Arc<RefreshEngine>,
    pub store: Arc<QueryStore>,
    pub metrics: Arc<DnsMetrics>,
}

#[derive(Default)]
pub struct PipelineBuilder {
    blocklist: BlocklistConfig,
    groups: Vec<ClientGroupConfig>,
    clients: std::collections::HashMap<String, ClientConfig>,
    local_records: Vec<LocalRecordConfig>,
    upstream_delay: Duration,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_denylist(mut self, entries: &[&str]) -> Self {
        self.blocklist.denylist = entries.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_group(mut self, group: ClientGroupConfig) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_client(mut self, ip: &str, name: Option<&str>, group: Option<&str>) -> Self {
        self.clients.insert(
            ip.to_string(),
            ClientConfig {
                name: name.map(str::to_string),
                group: group.map(str::to_string),
            },
        );
        self
    }

    pub fn with_local_record(mut self, name: &str, rtype: RecordType, value: &str) -> Self {
        self.local_records.push(LocalRecordConfig {
            name: name.to_string(),
            record_type: rtype,
            value: value.to_string(),
            ttl: 3_600,
        });
        self
    }

    pub fn with_upstream_delay(mut self, delay: Duration) -> Self {
        self.upstream_delay = delay;
        self
    }

    pub async fn build(mut self) -> TestPipeline {
        if !self.groups.iter().any(|g| g.id == "default") {
            self.groups.push(group("default"));
        }

        let metrics = DnsMetrics::new();
        let trace = Arc::new(TraceGate::default());
        let l0 = Arc::new(L0Cache::new(10_000, 64 * 1024 * 1024));
        let shared = Arc::new(MemorySharedCache::new());
        let shared_dyn: Arc<dyn SharedCacheStore> = shared.clone();

        let engine = Arc::new(BlocklistEngine::new().unwrap());
        engine
            .apply_config(self.blocklist.clone(), self.groups.clone())
            .await
            .unwrap();

        let policy = Arc::new(PolicyResolver::new(engine));
        policy.apply_config(&self.groups);

        let client_map = Arc::new(ClientMap::new());
        client_map.apply_config(&self.clients);

        let local_records = Arc::new(LocalRecords::new());
        local_records.apply_config(&self.local_records);

        let upstream = ScriptedUpstream::new(self.upstream_delay);
        let upstream_dyn: Arc<dyn UpstreamExchanger> = upstream.clone();
        let singleflight = Arc::new(Singleflight::new(upstream_dyn));

        let cache_config = CacheConfig::default();
        let refresh = RefreshEngine::new(
            Arc::clone(&l0),
            Arc::clone(&shared_dyn),
            Arc::clone(&singleflight),
            RefreshConfig::default(),
            &cache_config.l1,
            Arc::clone(&metrics),
            Arc::clone(&trace),
        );

        let store = QueryStore::new(10_000, Arc::clone(&metrics));

        let resolver = QueryResolver::new(ResolverParts {
            client_map,
            local_records,
            policy,
            l0: Arc::clone(&l0),
            shared: shared_dyn,
            singleflight,
            refresh: Arc::clone(&refresh),
            sink: store.clone(),
            metrics: Arc::clone(&metrics),
            trace,
            resolver_config: ResolverConfig::default(),
            cache_config,
            blocklist_config: self.blocklist,
        });

        TestPipeline {
            resolver,
            upstream,
            l0,
            shared,
            refresh,
            store,
            metrics,
        }
    }
}

pub fn group(id: &str) -> ClientGroupConfig {
    ClientGroupConfig {
        id: id.to_string(),
        name: None,
        inherit_global: true,
        extra_sources: Vec::new(),
        allowlist: Vec::new(),
        denylist: Vec::new(),
        safe_search: Default::default(),
        scheduled_pause: Vec::new(),
    }
}

/// A single-question A/AAAA/etc request as a client would send it.
pub fn build_request(name: &str, rtype: RecordType) -> Message {
    let mut query = Query::new();
    query.set_name(Name::from_str(name).unwrap());
    query.set_query_type(hickory_proto::rr::RecordType::from(rtype.to_u16()));
    query.set_query_class(hickory_proto::rr::DNSClass::IN);

    let mut message = Message::new(0x1234, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);
    message
}

/// First A-record address in the response, if any.
pub fn first_a(message: &Message) -> Option<Ipv4Addr> {
    message.answers().iter().find_map(|r| match r.data() {
        RData::A(a) => Some(a.0),
        _ => None,
    })
}
