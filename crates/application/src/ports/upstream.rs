use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use strata_dns_domain::{Question, ResolveError};

/// A completed upstream exchange: the full wire-format response plus the
/// metadata cached alongside it.
#[derive(Debug, Clone)]
pub struct UpstreamAnswer {
    pub encoded: Bytes,
    pub rcode: u8,
    /// Smallest answer TTL, or the negative TTL for empty responses.
    pub min_ttl: u32,
}

/// One question, one answer, within `budget`. Failover across endpoints is
/// the implementation's concern; callers see a single exchange.
#[async_trait]
pub trait UpstreamExchanger: Send + Sync {
    async fn exchange(
        &self,
        question: &Question,
        budget: Duration,
    ) -> Result<UpstreamAnswer, ResolveError>;
}
