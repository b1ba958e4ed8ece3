use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("Malformed query: {0}")]
    ClientError(String),

    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Shared cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Upstream timeout after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Upstream refused query: {0}")]
    UpstreamRefused(String),

    #[error("Upstream network error: {0}")]
    UpstreamNetwork(String),

    #[error("No healthy upstream endpoints")]
    NoHealthyUpstreams,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolveError {
    /// Transport-level failures are retried against the next endpoint;
    /// protocol-level failures are returned to the caller as-is.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ResolveError::UpstreamTimeout(_)
                | ResolveError::UpstreamNetwork(_)
                | ResolveError::NoHealthyUpstreams
                | ResolveError::DeadlineExceeded
        )
    }
}
