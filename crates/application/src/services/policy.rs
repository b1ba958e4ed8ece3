use crate::ports::BlockFilterEngine;
use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use strata_dns_domain::config::{ClientGroupConfig, SafeSearchConfig};
use strata_dns_domain::{GroupId, Question, RecordType};
use tracing::debug;

/// Terminal policy verdict for one `(group, question)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Block,
    /// Resolve this name upstream instead; the client still sees its own
    /// question echoed back.
    Rewrite(Arc<str>),
}

/// Hostnames with an enforced-safe-search variant. The rewrite target hosts
/// pin safe results on the provider side.
const GOOGLE_SAFE_TARGET: &str = "forcesafesearch.google.com";
const BING_SAFE_TARGET: &str = "strict.bing.com";

const GOOGLE_HOSTS: &[&str] = &["google.com", "www.google.com"];
const BING_HOSTS: &[&str] = &["bing.com", "www.bing.com"];

#[derive(Debug, Clone, Copy, Default)]
struct GroupFlags {
    safe_search: SafeSearchConfig,
}

/// Per-group policy view: blocklist membership plus safe-search rewrites.
///
/// Group flags are a copy-on-write snapshot; `apply_config` rebuilds it
/// off-path and swaps.
pub struct PolicyResolver {
    filter: Arc<dyn BlockFilterEngine>,
    groups: ArcSwap<FxHashMap<GroupId, GroupFlags>>,
}

impl PolicyResolver {
    pub fn new(filter: Arc<dyn BlockFilterEngine>) -> Self {
        Self {
            filter,
            groups: ArcSwap::from_pointee(FxHashMap::default()),
        }
    }

    pub fn apply_config(&self, groups: &[ClientGroupConfig]) {
        let mut snapshot: FxHashMap<GroupId, GroupFlags> = FxHashMap::default();
        for group in groups {
            snapshot.insert(
                Arc::from(group.id.as_str()),
                GroupFlags {
                    safe_search: group.safe_search,
                },
            );
        }
        debug!(groups = snapshot.len(), "Policy snapshot swapped");
        self.groups.store(Arc::new(snapshot));
    }

    /// The ordered decision: block beats rewrite beats allow. Blocklist
    /// internals (allowlist precedence, scheduled pauses) are the filter's
    /// concern.
    pub fn decide(&self, group: &GroupId, question: &Question) -> PolicyDecision {
        if self.filter.is_blocked(&question.name, group) {
            return PolicyDecision::Block;
        }
        if let Some(target) = self.safe_search_target(group, question) {
            return PolicyDecision::Rewrite(target);
        }
        PolicyDecision::Allow
    }

    /// Fast membership check without the rewrite logic.
    pub fn group_filter(&self, group: &str, qname: &str) -> bool {
        self.filter.is_blocked(qname, group)
    }

    fn safe_search_target(&self, group: &GroupId, question: &Question) -> Option<Arc<str>> {
        if !matches!(question.qtype, RecordType::A | RecordType::AAAA) {
            return None;
        }
        let guard = self.groups.load();
        let flags = guard.get(group)?;
        if !flags.safe_search.any() {
            return None;
        }
        let name: &str = &question.name;
        if flags.safe_search.google && GOOGLE_HOSTS.contains(&name) {
            return Some(Arc::from(GOOGLE_SAFE_TARGET));
        }
        if flags.safe_search.bing && BING_HOSTS.contains(&name) {
            return Some(Arc::from(BING_SAFE_TARGET));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use strata_dns_domain::ResolveError;

    struct FixedFilter {
        blocked: Vec<&'static str>,
    }

    #[async_trait]
    impl BlockFilterEngine for FixedFilter {
        fn is_blocked(&self, domain: &str, _group: &str) -> bool {
            self.blocked.contains(&domain)
        }

        async fn reload(&self) -> Result<(), ResolveError> {
            Ok(())
        }

        fn compiled_domain_count(&self) -> usize {
            self.blocked.len()
        }
    }

    fn group_config(id: &str, google: bool) -> ClientGroupConfig {
        ClientGroupConfig {
            id: id.to_string(),
            name: None,
            inherit_global: true,
            extra_sources: Vec::new(),
            allowlist: Vec::new(),
            denylist: Vec::new(),
            safe_search: SafeSearchConfig {
                google,
                bing: false,
            },
            scheduled_pause: Vec::new(),
        }
    }

    fn resolver(blocked: Vec<&'static str>) -> PolicyResolver {
        PolicyResolver::new(Arc::new(FixedFilter { blocked }))
    }

    #[test]
    fn block_wins_over_rewrite() {
        let policy = resolver(vec!["google.com"]);
        policy.apply_config(&[group_config("kids", true)]);
        let group: GroupId = Arc::from("kids");
        let decision = policy.decide(&group, &Question::new("google.com", RecordType::A));
        assert_eq!(decision, PolicyDecision::Block);
    }

    #[test]
    fn safe_search_rewrites_address_queries_only() {
        let policy = resolver(vec![]);
        policy.apply_config(&[group_config("kids", true)]);
        let group: GroupId = Arc::from("kids");

        match policy.decide(&group, &Question::new("www.google.com", RecordType::A)) {
            PolicyDecision::Rewrite(target) => assert_eq!(&*target, "forcesafesearch.google.com"),
            other => panic!("expected rewrite, got {:?}", other),
        }

        let decision = policy.decide(&group, &Question::new("www.google.com", RecordType::TXT));
        assert_eq!(decision, PolicyDecision::Allow);
    }

    #[test]
    fn group_filter_is_a_bare_membership_check() {
        let policy = resolver(vec!["ads.example.com"]);
        assert!(policy.group_filter("default", "ads.example.com"));
        assert!(!policy.group_filter("default", "example.com"));
    }

    #[test]
    fn groups_without_safe_search_pass_through() {
        let policy = resolver(vec![]);
        policy.apply_config(&[group_config("office", false)]);
        let group: GroupId = Arc::from("office");
        let decision = policy.decide(&group, &Question::new("www.google.com", RecordType::A));
        assert_eq!(decision, PolicyDecision::Allow);
    }
}
