use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;

/// A node in the reversed-label suffix trie.
#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    /// Set when a wildcard pattern terminates at this node.
    /// `*.ads.com` sets the flag at the "ads" node after traversing "com".
    wildcard: bool,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            children: HashMap::with_hasher(FxBuildHasher),
            wildcard: false,
        }
    }
}

/// Suffix trie for wildcard domain matching.
///
/// Patterns like `*.ads.com` are stored as reversed label paths:
/// traverse ["com", "ads"], flag the "ads" node.
///
/// Lookup for `sub.ads.com`:
///   Reversed labels: ["com", "ads", "sub"]
///   Walk: root → "com" → "ads" (flag set, one label remains → match)
///
/// Built once during compilation and replaced wholesale via ArcSwap.
#[derive(Default)]
pub struct SuffixTrie {
    root: TrieNode,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Insert a wildcard pattern like `*.ads.com`. The leading `*.` is
    /// stripped before traversal.
    pub fn insert(&mut self, pattern: &str) {
        let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
        let mut node = &mut self.root;
        for label in domain.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        node.wildcard = true;
    }

    /// True when any stored wildcard matches `domain`.
    ///
    /// A flag at node N matches any domain that passes through N **and has
    /// at least one more label**: `*.ads.com` matches `sub.ads.com` but NOT
    /// the apex `ads.com`.
    #[inline]
    pub fn matches(&self, domain: &str) -> bool {
        let labels: SmallVec<[&str; 8]> = domain.split('.').rev().collect();
        let n = labels.len();
        let mut node = &self.root;

        for (i, label) in labels.iter().enumerate() {
            match node.children.get(*label) {
                Some(child) => {
                    if child.wildcard && i + 1 < n {
                        return true;
                    }
                    node = child;
                }
                None => return false,
            }
        }
        false
    }
}
