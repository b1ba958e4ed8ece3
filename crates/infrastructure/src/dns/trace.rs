use arc_swap::ArcSwap;
use compact_str::CompactString;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Event names the resolver checks on the hot path. Callers must gate any
/// string formatting behind `enabled()`; the check itself is one atomic
/// pointer load plus a set probe.
pub mod events {
    pub const QUERY_PIPELINE: &str = "query_pipeline";
    pub const CACHE_DECISION: &str = "cache_decision";
    pub const POLICY_DECISION: &str = "policy_decision";
    pub const UPSTREAM_EXCHANGE: &str = "upstream_exchange";
    pub const REFRESH: &str = "refresh";
}

/// Runtime-toggled debug event set with a lock-free read path.
pub struct TraceGate {
    enabled: ArcSwap<FxHashSet<CompactString>>,
}

impl TraceGate {
    pub fn new(names: &[String]) -> Self {
        let gate = Self {
            enabled: ArcSwap::from_pointee(FxHashSet::default()),
        };
        gate.set_events(names);
        gate
    }

    #[inline]
    pub fn enabled(&self, name: &str) -> bool {
        self.enabled.load().contains(name)
    }

    /// Swap in a new enabled set; takes effect immediately, no restart.
    pub fn set_events(&self, names: &[String]) {
        let set: FxHashSet<CompactString> = names
            .iter()
            .map(|n| CompactString::new(n.trim()))
            .collect();
        self.enabled.store(Arc::new(set));
    }
}

impl Default for TraceGate {
    fn default() -> Self {
        Self::new(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_at_runtime() {
        let gate = TraceGate::new(&["query_pipeline".into()]);
        assert!(gate.enabled(events::QUERY_PIPELINE));
        assert!(!gate.enabled(events::CACHE_DECISION));

        gate.set_events(&["cache_decision".into()]);
        assert!(!gate.enabled(events::QUERY_PIPELINE));
        assert!(gate.enabled(events::CACHE_DECISION));
    }
}
