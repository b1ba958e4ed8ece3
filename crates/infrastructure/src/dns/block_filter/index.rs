use super::suffix_trie::SuffixTrie;
use chrono::{Datelike, Local, NaiveTime, Timelike, Weekday};
use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};
use strata_dns_domain::{CompiledPause, GroupId, DEFAULT_GROUP};

/// A set of host patterns: exact names plus `*.` wildcards.
///
/// Membership uses parent-label matching: `a.b.c` is in the set when any of
/// `a.b.c`, `b.c`, `c` is an exact entry, or when a wildcard covers it.
#[derive(Default)]
pub struct HostSet {
    exact: FxHashSet<CompactString>,
    wildcard: SuffixTrie,
}

impl HostSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: &str) {
        if entry.starts_with("*.") {
            self.wildcard.insert(entry);
        } else {
            self.exact.insert(CompactString::new(entry));
        }
    }

    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a str>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    #[inline]
    pub fn matches(&self, domain: &str) -> bool {
        if self.exact.contains(domain) {
            return true;
        }
        let mut rest = domain;
        while let Some((_, parent)) = rest.split_once('.') {
            if self.exact.contains(parent) {
                return true;
            }
            rest = parent;
        }
        self.wildcard.matches(domain)
    }

    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard.is_empty()
    }
}

/// Per-group view over the global set.
#[derive(Default)]
pub struct GroupOverlay {
    pub allow: HostSet,
    pub deny: HostSet,
    pub inherit_global: bool,
    pub pauses: Vec<CompiledPause>,
}

/// The compiled filter index. Immutable once built; replaced atomically via
/// `ArcSwap<BlockIndex>` on reload, so readers never lock.
#[derive(Default)]
pub struct BlockIndex {
    pub global: HostSet,
    pub global_allow: HostSet,
    pub groups: FxHashMap<GroupId, GroupOverlay>,
    pub total_blocked: usize,
}

impl BlockIndex {
    /// Membership check for `(group, domain)` at the current local time.
    #[inline]
    pub fn is_blocked(&self, domain: &str, group: &str) -> bool {
        let now = Local::now();
        let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), now.second())
            .unwrap_or(NaiveTime::MIN);
        self.is_blocked_at(domain, group, now.weekday(), time)
    }

    /// Deterministic form used by tests. Order is normative:
    /// pause → group allow → global allow → group deny → inherited global.
    pub fn is_blocked_at(
        &self,
        domain: &str,
        group: &str,
        day: Weekday,
        time: NaiveTime,
    ) -> bool {
        let overlay = self
            .groups
            .get(group)
            .or_else(|| self.groups.get(DEFAULT_GROUP));

        if let Some(overlay) = overlay {
            if overlay.pauses.iter().any(|p| p.contains(day, time)) {
                return false;
            }
            if overlay.allow.matches(domain) {
                return false;
            }
        }
        if self.global_allow.matches(domain) {
            return false;
        }
        if let Some(overlay) = overlay {
            if overlay.deny.matches(domain) {
                return true;
            }
            if !overlay.inherit_global {
                return false;
            }
        }
        self.global.matches(domain)
    }
}
