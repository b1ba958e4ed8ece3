use serde::{Deserialize, Serialize};

/// Answer synthesized for blocked queries that are neither A nor AAAA
/// (those always get the unspecified address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockResponse {
    #[default]
    Nxdomain,
    Empty,
}

/// Global blocklist configuration. Per-group overlays live in
/// `client_groups`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlocklistConfig {
    /// URLs of hosts-file or plain-host sources.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Names never blocked, for every group.
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Manually blocked names, for every inheriting group.
    #[serde(default)]
    pub denylist: Vec<String>,

    /// Source refetch cadence, seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    #[serde(default)]
    pub block_response: BlockResponse,

    /// TTL stamped on synthesized block answers.
    #[serde(default = "default_block_ttl")]
    pub block_ttl: u32,
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            allowlist: Vec::new(),
            denylist: Vec::new(),
            refresh_interval: default_refresh_interval(),
            block_response: BlockResponse::default(),
            block_ttl: default_block_ttl(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    86_400
}

fn default_block_ttl() -> u32 {
    60
}
