use crate::RecordType;
use serde::{Deserialize, Serialize};

/// Static hostname mapping answered authoritatively without consulting
/// cache, blocklists, or upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalRecordConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub record_type: RecordType,

    pub value: String,

    /// TTL stamped on the answer.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

fn default_ttl() -> u32 {
    3_600
}
