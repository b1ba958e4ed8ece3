use serde::{Deserialize, Serialize};

/// Cache tier configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub l0: L0Config,

    #[serde(default)]
    pub l1: L1Config,
}

/// Process-local LRU bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct L0Config {
    #[serde(default = "default_l0_size")]
    pub size: usize,

    #[serde(default = "default_l0_max_bytes")]
    pub max_bytes: usize,
}

impl Default for L0Config {
    fn default() -> Self {
        Self {
            size: default_l0_size(),
            max_bytes: default_l0_max_bytes(),
        }
    }
}

/// Shared cache topology. Exactly one of the three modes is active; the
/// fields for inactive modes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum L1Mode {
    Standalone,
    Sentinel,
    Cluster,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct L1Config {
    #[serde(default = "default_l1_mode")]
    pub mode: L1Mode,

    /// Standalone mode: single server address.
    #[serde(default = "default_l1_address")]
    pub address: String,

    #[serde(default)]
    pub sentinel: SentinelConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Floor for the store-side expiry of fresh entries, seconds.
    #[serde(default = "default_l1_ttl")]
    pub ttl_default: u64,

    /// How long past expiry an entry stays servable when upstream is down.
    #[serde(default = "default_serve_stale")]
    pub serve_stale: u64,

    /// Bound on the fire-and-forget write queue.
    #[serde(default = "default_write_queue")]
    pub write_queue: usize,
}

impl Default for L1Config {
    fn default() -> Self {
        Self {
            mode: default_l1_mode(),
            address: default_l1_address(),
            sentinel: SentinelConfig::default(),
            cluster: ClusterConfig::default(),
            ttl_default: default_l1_ttl(),
            serve_stale: default_serve_stale(),
            write_queue: default_write_queue(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SentinelConfig {
    /// Master name registered with the sentinels.
    #[serde(default)]
    pub master: String,

    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Seed node addresses.
    #[serde(default)]
    pub nodes: Vec<String>,
}

fn default_l0_size() -> usize {
    10_000
}

fn default_l0_max_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_l1_mode() -> L1Mode {
    L1Mode::Standalone
}

fn default_l1_address() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_l1_ttl() -> u64 {
    300
}

fn default_serve_stale() -> u64 {
    3_600
}

fn default_write_queue() -> usize {
    1_024
}
