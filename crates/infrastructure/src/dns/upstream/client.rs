use super::endpoint::UpstreamEndpoint;
use super::transport;
use crate::dns::forwarding::{MessageBuilder, ResponseMeta};
use async_trait::async_trait;
use bytes::Bytes;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_dns_application::ports::{UpstreamAnswer, UpstreamExchanger};
use strata_dns_domain::config::{ResolverConfig, UpstreamConfig, UpstreamProtocol};
use strata_dns_domain::{Question, ResolveError};
use tracing::{debug, warn};

/// Floor for a single attempt so a nearly-exhausted budget still gets a
/// real try instead of an instant timeout.
const MIN_ATTEMPT: Duration = Duration::from_millis(200);

/// TTL recorded for responses that carry neither answers nor a SOA.
const FALLBACK_TTL: u32 = 60;

/// Health-tracked pool of upstream resolvers.
///
/// Endpoints are tried in configuration order, skipping degraded ones.
/// Transport failures and server failures (SERVFAIL/REFUSED) degrade the
/// endpoint and move on to the next; NXDOMAIN and NOERROR are answers.
pub struct UpstreamClient {
    endpoints: Vec<Arc<UpstreamEndpoint>>,
}

impl UpstreamClient {
    pub fn new(
        upstreams: &[UpstreamConfig],
        resolver: &ResolverConfig,
    ) -> Result<Self, ResolveError> {
        let window = Duration::from_secs(resolver.health_window_secs);
        let endpoints = upstreams
            .iter()
            .map(|config| {
                UpstreamEndpoint::from_config(config, resolver.health_failures, window)
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(ResolveError::NoHealthyUpstreams);
        }
        Ok(Self { endpoints })
    }

    pub fn endpoints(&self) -> &[Arc<UpstreamEndpoint>] {
        &self.endpoints
    }

    async fn attempt(
        endpoint: &UpstreamEndpoint,
        query: &[u8],
        budget: Duration,
    ) -> Result<Vec<u8>, ResolveError> {
        match endpoint.protocol {
            UpstreamProtocol::Udp => {
                let start = Instant::now();
                let response = transport::exchange_udp(endpoint.addr, query, budget).await?;
                let meta = ResponseMeta::parse(&response)?;
                if meta.truncated {
                    debug!(endpoint = %endpoint.display, "Response truncated (TC bit), retrying via TCP");
                    let remaining = budget
                        .checked_sub(start.elapsed())
                        .unwrap_or(Duration::from_millis(500));
                    return transport::exchange_tcp(endpoint.addr, query, remaining).await;
                }
                Ok(response)
            }
            UpstreamProtocol::Tcp => transport::exchange_tcp(endpoint.addr, query, budget).await,
            UpstreamProtocol::Tls => {
                transport::exchange_tls(endpoint.addr, &endpoint.tls_name, query, budget).await
            }
        }
    }
}

#[async_trait]
impl UpstreamExchanger for UpstreamClient {
    async fn exchange(
        &self,
        question: &Question,
        budget: Duration,
    ) -> Result<UpstreamAnswer, ResolveError> {
        let deadline = Instant::now() + budget;
        let (query_id, query_bytes) = MessageBuilder::build_query(question)?;

        let available: SmallVec<[&Arc<UpstreamEndpoint>; 8]> = self
            .endpoints
            .iter()
            .filter(|e| e.is_available())
            .collect();
        if available.is_empty() {
            return Err(ResolveError::NoHealthyUpstreams);
        }

        let mut last_error = ResolveError::NoHealthyUpstreams;
        for (index, endpoint) in available.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ResolveError::UpstreamTimeout(budget));
            }
            let attempts_left = (available.len() - index) as u32;
            let attempt_budget = (remaining / attempts_left).max(MIN_ATTEMPT).min(remaining);

            match Self::attempt(endpoint, &query_bytes, attempt_budget).await {
                Ok(response) => {
                    let meta = match ResponseMeta::parse(&response) {
                        Ok(meta) => meta,
                        Err(e) => {
                            warn!(endpoint = %endpoint.display, error = %e, "Unparseable upstream response");
                            endpoint.on_failure();
                            last_error = e;
                            continue;
                        }
                    };
                    if response.len() >= 2
                        && u16::from_be_bytes([response[0], response[1]]) != query_id
                    {
                        warn!(endpoint = %endpoint.display, "Response id mismatch, discarding");
                        endpoint.on_failure();
                        last_error =
                            ResolveError::UpstreamNetwork("response id mismatch".into());
                        continue;
                    }
                    if meta.is_server_failure() {
                        debug!(endpoint = %endpoint.display, rcode = ?meta.rcode, "Server failure, trying next endpoint");
                        endpoint.on_failure();
                        last_error =
                            ResolveError::UpstreamRefused(format!("{:?}", meta.rcode));
                        continue;
                    }

                    endpoint.on_success();
                    return Ok(UpstreamAnswer {
                        encoded: Bytes::from(response),
                        rcode: meta.rcode.low(),
                        min_ttl: meta.effective_ttl(FALLBACK_TTL),
                    });
                }
                Err(e) => {
                    debug!(endpoint = %endpoint.display, error = %e, "Upstream attempt failed");
                    endpoint.on_failure();
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
