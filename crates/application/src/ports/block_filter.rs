use async_trait::async_trait;
use strata_dns_domain::ResolveError;

/// Compiled blocklist membership. Implementations swap their index
/// atomically on `reload`; readers never block.
#[async_trait]
pub trait BlockFilterEngine: Send + Sync {
    /// True when `domain` is blocked for `group` right now, accounting for
    /// allowlist precedence and any active scheduled pause.
    fn is_blocked(&self, domain: &str, group: &str) -> bool;

    /// Refetch sources and atomically swap in the recompiled index.
    async fn reload(&self) -> Result<(), ResolveError>;

    /// Unique exact-blocked names in the current index.
    fn compiled_domain_count(&self) -> usize;
}
