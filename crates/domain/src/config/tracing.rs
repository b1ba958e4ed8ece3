use serde::{Deserialize, Serialize};

/// Named debug events enabled at startup. The set can be swapped at runtime
/// through the trace gate without a restart.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub events: Vec<String>,
}
