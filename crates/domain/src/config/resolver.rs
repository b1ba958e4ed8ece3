use serde::{Deserialize, Serialize};

/// Request-path budgets and endpoint health tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Total budget for one request, milliseconds. Every downstream call
    /// inherits whatever is left of it.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Budget for a single L1 read before it is treated as a miss.
    #[serde(default = "default_l1_read_timeout_ms")]
    pub l1_read_timeout_ms: u64,

    /// Failures within the health window that degrade an endpoint.
    #[serde(default = "default_health_failures")]
    pub health_failures: u32,

    /// Health window, seconds.
    #[serde(default = "default_health_window_secs")]
    pub health_window_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            l1_read_timeout_ms: default_l1_read_timeout_ms(),
            health_failures: default_health_failures(),
            health_window_secs: default_health_window_secs(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    2_000
}

fn default_l1_read_timeout_ms() -> u64 {
    150
}

fn default_health_failures() -> u32 {
    3
}

fn default_health_window_secs() -> u64 {
    30
}
