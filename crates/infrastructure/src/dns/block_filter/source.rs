use chrono::{DateTime, Utc};
use compact_str::CompactString;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use strata_dns_domain::ResolveError;

/// Host entries that appear in every stock hosts file and must never land
/// in a block set.
const SKIP_HOSTS: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "ip6-localhost",
    "ip6-loopback",
    "ip6-localnet",
    "ip6-mcastprefix",
    "ip6-allnodes",
    "ip6-allrouters",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Idle,
    Fetching,
    Applied,
    Failed,
}

/// Per-URL fetch state. A failed refetch keeps the previously applied host
/// set so one flaky mirror cannot blank a list.
#[derive(Clone)]
pub struct SourceState {
    pub status: SourceStatus,
    pub last_applied_hash: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub hosts: Arc<Vec<CompactString>>,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            status: SourceStatus::Idle,
            last_applied_hash: None,
            last_refresh: None,
            hosts: Arc::new(Vec::new()),
        }
    }
}

pub async fn fetch_source(client: &reqwest::Client, url: &str) -> Result<String, ResolveError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ResolveError::Internal(format!("blocklist fetch '{}': {}", url, e)))?
        .error_for_status()
        .map_err(|e| ResolveError::Internal(format!("blocklist fetch '{}': {}", url, e)))?;
    response
        .text()
        .await
        .map_err(|e| ResolveError::Internal(format!("blocklist body '{}': {}", url, e)))
}

pub fn body_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Parse one source body. Accepts plain host lines and hosts-file syntax
/// (leading IP, multiple hostnames per line); `#` starts a comment.
/// Entries are normalized: trimmed, lowercased, trailing dot stripped,
/// deduplication left to the set they land in.
pub fn parse_hosts(body: &str) -> Vec<CompactString> {
    let mut hosts = Vec::new();
    for line in body.lines() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let first = match tokens.next() {
            Some(t) => t,
            None => continue,
        };

        if first.parse::<std::net::IpAddr>().is_ok() {
            // Hosts-file line: every remaining token is a hostname.
            for token in tokens {
                push_host(&mut hosts, token);
            }
        } else {
            push_host(&mut hosts, first);
        }
    }
    hosts
}

fn push_host(hosts: &mut Vec<CompactString>, raw: &str) {
    let normalized = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if normalized.is_empty() || SKIP_HOSTS.contains(&normalized.as_str()) {
        return;
    }
    hosts.push(CompactString::new(normalized));
}
