use serde::{Deserialize, Serialize};

/// Asynchronous query analytics.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryStoreConfig {
    #[serde(default)]
    pub enabled: bool,

    /// HTTP insert endpoint of the columnar store.
    #[serde(default)]
    pub url: String,

    /// Flush when this many events are buffered.
    #[serde(default = "default_batch")]
    pub batch: usize,

    /// Flush at least this often, seconds.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    /// Ring buffer capacity; a full buffer drops new events.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Attempts per batch before it is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for QueryStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            batch: default_batch(),
            flush_interval_secs: default_flush_interval(),
            buffer_size: default_buffer_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_batch() -> usize {
    500
}

fn default_flush_interval() -> u64 {
    5
}

fn default_buffer_size() -> usize {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}
