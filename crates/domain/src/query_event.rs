use super::{GroupId, RecordType};
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;

/// How a request terminated. Exactly one outcome is assigned per query and
/// carried into analytics and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Local,
    L0Hit,
    L1Hit,
    Stale,
    Blocked,
    Upstream,
    Error,
}

impl QueryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::L0Hit => "l0_hit",
            Self::L1Hit => "l1_hit",
            Self::Stale => "stale",
            Self::Blocked => "blocked",
            Self::Upstream => "upstream",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analytics row per served query.
///
/// Cloning is cheap (`Arc<str>` fields); events cross a bounded buffer on
/// the way to the columnar store and must never make the hot path wait.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub ts: DateTime<Utc>,
    pub client_ip: IpAddr,
    pub client_name: Arc<str>,
    pub group_id: GroupId,
    pub qname: Arc<str>,
    pub qtype: RecordType,
    pub rcode: u8,
    pub duration_ms: u64,
    pub outcome: QueryOutcome,
}
