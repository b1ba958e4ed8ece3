use serde::{Deserialize, Serialize};

/// Background refresh of hot shared-cache entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    /// Sweeper cadence, seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Keys examined per sweep.
    #[serde(default = "default_max_per_sweep")]
    pub max_per_sweep: usize,

    /// An entry is refresh-eligible when its remaining TTL drops below this
    /// percentage of the original TTL...
    #[serde(default = "default_threshold_pct")]
    pub threshold_pct: u32,

    /// ...or below this absolute floor, whichever is larger.
    #[serde(default = "default_min_threshold")]
    pub min_threshold_secs: u32,

    /// Worker tasks servicing hot-path refresh hints.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Bound on the hint channel; full channel drops the hint.
    #[serde(default = "default_queue")]
    pub queue: usize,

    /// Budget for one refresh exchange, milliseconds.
    #[serde(default = "default_exchange_timeout_ms")]
    pub exchange_timeout_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            max_per_sweep: default_max_per_sweep(),
            threshold_pct: default_threshold_pct(),
            min_threshold_secs: default_min_threshold(),
            workers: default_workers(),
            queue: default_queue(),
            exchange_timeout_ms: default_exchange_timeout_ms(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    15
}

fn default_max_per_sweep() -> usize {
    256
}

fn default_threshold_pct() -> u32 {
    20
}

fn default_min_threshold() -> u32 {
    30
}

fn default_workers() -> usize {
    2
}

fn default_queue() -> usize {
    1_024
}

fn default_exchange_timeout_ms() -> u64 {
    2_000
}
