use crate::dns::cache::coarse_clock::coarse_now_secs;
use crate::dns::cache::L0Cache;
use crate::dns::client_map::ClientMap;
use crate::dns::forwarding::{RecordTypeMapper, ResponseWriter};
use crate::dns::local_records::LocalRecords;
use crate::dns::metrics::DnsMetrics;
use crate::dns::refresh::RefreshEngine;
use crate::dns::trace::{events, TraceGate};
use crate::dns::upstream::Singleflight;
use chrono::Utc;
use hickory_proto::op::{Message, ResponseCode};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_dns_application::ports::{QueryEventSink, SharedCacheStore};
use strata_dns_application::services::policy::{PolicyDecision, PolicyResolver};
use strata_dns_domain::config::{BlockResponse, BlocklistConfig, CacheConfig, ResolverConfig};
use strata_dns_domain::{CacheEntry, CacheKey, QueryEvent, QueryOutcome, Question, ResolveError};
use tracing::{debug, error};

/// TTL stamped on answers served from an expired entry.
const STALE_SERVE_TTL: u32 = 30;

/// Hard cap on request size; anything larger is FORMERR.
const MAX_REQUEST_SIZE: usize = 65_535;

/// Everything the pipeline needs, wired once at startup.
pub struct ResolverParts {
    pub client_map: Arc<ClientMap>,
    pub local_records: Arc<LocalRecords>,
    pub policy: Arc<PolicyResolver>,
    pub l0: Arc<L0Cache>,
    pub shared: Arc<dyn SharedCacheStore>,
    pub singleflight: Arc<Singleflight>,
    pub refresh: Arc<RefreshEngine>,
    pub sink: Arc<dyn QueryEventSink>,
    pub metrics: Arc<DnsMetrics>,
    pub trace: Arc<TraceGate>,
    pub resolver_config: ResolverConfig,
    pub cache_config: CacheConfig,
    pub blocklist_config: BlocklistConfig,
}

/// The result of one served request.
pub struct ServeResult {
    pub message: Message,
    pub outcome: QueryOutcome,
}

/// The request pipeline. Each step may short-circuit; the order is
/// normative: validate → classify → local records → policy → safe-search →
/// L0 → L1 (promote) → singleflight upstream → stale fallback → SERVFAIL.
pub struct QueryResolver {
    parts: ResolverParts,
    request_timeout: Duration,
    l1_read_timeout: Duration,
    l1_ttl_floor: u64,
    serve_stale_secs: u64,
    block_response: BlockResponse,
    block_ttl: u32,
}

impl QueryResolver {
    pub fn new(parts: ResolverParts) -> Arc<Self> {
        let request_timeout = Duration::from_millis(parts.resolver_config.request_timeout_ms);
        let l1_read_timeout = Duration::from_millis(parts.resolver_config.l1_read_timeout_ms);
        let l1_ttl_floor = parts.cache_config.l1.ttl_default;
        let serve_stale_secs = parts.cache_config.l1.serve_stale;
        let block_response = parts.blocklist_config.block_response;
        let block_ttl = parts.blocklist_config.block_ttl;
        Arc::new(Self {
            parts,
            request_timeout,
            l1_read_timeout,
            l1_ttl_floor,
            serve_stale_secs,
            block_response,
            block_ttl,
        })
    }

    /// Raw-bytes entry point used by tests and by transports that hand us
    /// undecoded datagrams.
    pub async fn serve_bytes(&self, raw: &[u8], source: IpAddr) -> Vec<u8> {
        if raw.len() > MAX_REQUEST_SIZE {
            return encode_or_empty(&formerr_for_raw(raw));
        }
        let request = match Message::from_vec(raw) {
            Ok(message) => message,
            Err(_) => return encode_or_empty(&formerr_for_raw(raw)),
        };
        let result = self.serve(&request, source).await;
        encode_or_empty(&result.message)
    }

    /// The pipeline proper.
    pub async fn serve(&self, request: &Message, source: IpAddr) -> ServeResult {
        let started = Instant::now();
        let deadline = started + self.request_timeout;

        // Step 1: validate. Exactly one question, everything else FORMERR.
        let query = match request.queries() {
            [single] => single,
            _ => {
                return ServeResult {
                    message: ResponseWriter::error_response(request, ResponseCode::FormErr),
                    outcome: QueryOutcome::Error,
                }
            }
        };
        let qtype = RecordTypeMapper::from_hickory(query.query_type());
        let question = Question::new(query.name().to_utf8(), qtype);

        // Step 2: classify client.
        let (client_name, group) = self.parts.client_map.identify(source);

        if self.parts.trace.enabled(events::QUERY_PIPELINE) {
            debug!(
                qname = %question.name,
                qtype = %qtype,
                client = %client_name,
                group = %group,
                "Query received"
            );
        }

        let (message, outcome) = self
            .resolve_question(request, &question, &group, deadline)
            .await;

        self.parts.metrics.update_hit_rate();
        self.parts
            .metrics
            .l0_entries
            .set(self.parts.l0.len() as i64);
        self.parts
            .metrics
            .l1_degraded
            .set(self.parts.shared.is_degraded() as i64);

        self.parts.sink.record(QueryEvent {
            ts: Utc::now(),
            client_ip: source,
            client_name,
            group_id: Arc::clone(&group),
            qname: Arc::clone(&question.name),
            qtype,
            rcode: message.response_code().low(),
            duration_ms: started.elapsed().as_millis() as u64,
            outcome,
        });

        ServeResult { message, outcome }
    }

    async fn resolve_question(
        &self,
        request: &Message,
        question: &Question,
        group: &Arc<str>,
        deadline: Instant,
    ) -> (Message, QueryOutcome) {
        // Step 3: local records shadow everything, blocklists included.
        if let Some(records) = self
            .parts
            .local_records
            .lookup(&question.name, question.qtype)
        {
            match ResponseWriter::local_answer(&records, request) {
                Ok(message) => return (message, QueryOutcome::Local),
                Err(e) => {
                    error!(event = "query_resolution", error = %e, "Local record synthesis failed");
                    return self.servfail(request);
                }
            }
        }

        // Steps 4–5: policy decision, then safe-search rewrite. A blocked
        // query never reaches upstream and never populates any cache tier.
        let mut lookup = question.clone();
        match self.parts.policy.decide(group, question) {
            PolicyDecision::Block => {
                if self.parts.trace.enabled(events::POLICY_DECISION) {
                    debug!(qname = %question.name, group = %group, "Query blocked");
                }
                self.parts.metrics.queries_blocked.inc();
                return match ResponseWriter::block_answer(
                    request,
                    question.qtype,
                    self.block_response,
                    self.block_ttl,
                ) {
                    Ok(message) => (message, QueryOutcome::Blocked),
                    Err(e) => {
                        error!(event = "query_resolution", error = %e, "Block synthesis failed");
                        self.servfail(request)
                    }
                };
            }
            PolicyDecision::Rewrite(target) => {
                if self.parts.trace.enabled(events::POLICY_DECISION) {
                    debug!(qname = %question.name, target = %target, "Safe-search rewrite");
                }
                lookup = Question::from_normalized(target, question.qtype);
            }
            PolicyDecision::Allow => {}
        }

        // The key always carries the *original* question so a later policy
        // change takes effect without a cache purge.
        let key = CacheKey::new(
            Arc::clone(&question.name),
            question.qtype,
            Arc::clone(group),
        );
        let now = coarse_now_secs();
        let mut stale_candidate: Option<CacheEntry> = None;

        // Step 6: L0.
        if let Some(entry) = self.parts.l0.get(&key) {
            if entry.is_fresh(now) {
                if self.parts.trace.enabled(events::CACHE_DECISION) {
                    debug!(qname = %question.name, ttl = entry.remaining_ttl(now), "L0 hit");
                }
                self.parts.shared.record_hit(&key.shared_key());
                if self.parts.refresh.needs_refresh(&entry, now) {
                    self.parts.refresh.hint(&key);
                }
                self.parts.metrics.l0_hits.inc();
                self.parts.metrics.cache_hits.inc();
                return self.reply_from_entry(request, &entry, entry.remaining_ttl(now), QueryOutcome::L0Hit);
            }
            stale_candidate = Some(entry);
        }

        // Step 7: L1, promoted to L0 on hit. A degraded store reads as a
        // miss; the read itself is capped so it cannot eat the budget.
        let l1_budget = self
            .l1_read_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        if !l1_budget.is_zero() {
            let lookup_result =
                tokio::time::timeout(l1_budget, self.parts.shared.get(&key.shared_key())).await;
            if let Ok(Some(entry)) = lookup_result {
                if entry.is_fresh(now) {
                    if self.parts.trace.enabled(events::CACHE_DECISION) {
                        debug!(qname = %question.name, ttl = entry.remaining_ttl(now), "L1 hit");
                    }
                    self.parts.l0.put(key.clone(), entry.clone());
                    self.parts.shared.record_hit(&key.shared_key());
                    if self.parts.refresh.needs_refresh(&entry, now) {
                        self.parts.refresh.hint(&key);
                    }
                    self.parts.metrics.l1_hits.inc();
                    self.parts.metrics.cache_hits.inc();
                    return self.reply_from_entry(
                        request,
                        &entry,
                        entry.remaining_ttl(now),
                        QueryOutcome::L1Hit,
                    );
                }
                stale_candidate = stale_candidate.or(Some(entry));
            }
        }

        // Step 8: coalesced upstream exchange, then L1 write before L0
        // write so a reader that misses L0 never sees L0 ahead of L1.
        let budget = deadline.saturating_duration_since(Instant::now());
        let exchange = if budget.is_zero() {
            Err(ResolveError::DeadlineExceeded)
        } else {
            if self.parts.trace.enabled(events::UPSTREAM_EXCHANGE) {
                debug!(qname = %lookup.name, budget = ?budget, "Dispatching upstream");
            }
            self.parts.singleflight.exchange(&key, &lookup, budget).await
        };

        match exchange {
            Ok(answer) => {
                let entry = CacheEntry::new(answer.encoded, answer.min_ttl, now, answer.rcode);
                let expiry = Duration::from_secs(
                    (answer.min_ttl as u64).max(self.l1_ttl_floor) + self.serve_stale_secs,
                );
                self.parts
                    .shared
                    .put(key.shared_key(), entry.clone(), expiry);
                self.parts.l0.put(key.clone(), entry.clone());
                self.parts.metrics.cache_misses.inc();
                self.reply_from_entry(request, &entry, entry.original_ttl, QueryOutcome::Upstream)
            }
            Err(e) => {
                // Step 9: stale fallback, refresh enqueued for later.
                if let Some(stale) = stale_candidate {
                    if stale.is_within_stale_window(now, self.serve_stale_secs) {
                        debug!(qname = %question.name, error = %e, "Upstream failed, serving stale");
                        self.parts.refresh.hint(&key);
                        return self.reply_from_entry(
                            request,
                            &stale,
                            STALE_SERVE_TTL,
                            QueryOutcome::Stale,
                        );
                    }
                }
                // Step 10: terminal error.
                debug!(qname = %question.name, error = %e, "Upstream failed, no stale available");
                self.servfail(request)
            }
        }
    }

    fn reply_from_entry(
        &self,
        request: &Message,
        entry: &CacheEntry,
        serve_ttl: u32,
        outcome: QueryOutcome,
    ) -> (Message, QueryOutcome) {
        match ResponseWriter::from_cache_entry(entry, request, serve_ttl) {
            Ok(message) => (message, outcome),
            Err(e) => {
                error!(event = "query_resolution", error = %e, "Cached entry replay failed");
                self.servfail(request)
            }
        }
    }

    fn servfail(&self, request: &Message) -> (Message, QueryOutcome) {
        (
            ResponseWriter::error_response(request, ResponseCode::ServFail),
            QueryOutcome::Error,
        )
    }

    pub fn metrics(&self) -> &Arc<DnsMetrics> {
        &self.parts.metrics
    }
}

fn encode_or_empty(message: &Message) -> Vec<u8> {
    message.to_vec().unwrap_or_default()
}

/// Best-effort FORMERR for requests we could not decode: echo the id when
/// at least a header prefix arrived.
fn formerr_for_raw(raw: &[u8]) -> Message {
    use hickory_proto::op::{MessageType, OpCode};
    let id = if raw.len() >= 2 {
        u16::from_be_bytes([raw[0], raw[1]])
    } else {
        0
    };
    let mut message = Message::new(id, MessageType::Response, OpCode::Query);
    message.set_response_code(ResponseCode::FormErr);
    message
}

impl std::fmt::Debug for QueryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResolver")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
