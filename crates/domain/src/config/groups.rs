use serde::{Deserialize, Serialize};

/// A named policy bucket. Clients are assigned to at most one group; the
/// `default` group applies to everyone else and is created implicitly when
/// the configuration does not define it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientGroupConfig {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Whether the global blocklist applies on top of the group's own lists.
    #[serde(default = "default_true")]
    pub inherit_global: bool,

    /// Extra blocklist source URLs active only for this group.
    #[serde(default)]
    pub extra_sources: Vec<String>,

    #[serde(default)]
    pub allowlist: Vec<String>,

    #[serde(default)]
    pub denylist: Vec<String>,

    #[serde(default)]
    pub safe_search: SafeSearchConfig,

    #[serde(default)]
    pub scheduled_pause: Vec<PauseWindowConfig>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct SafeSearchConfig {
    #[serde(default)]
    pub google: bool,

    #[serde(default)]
    pub bing: bool,
}

impl SafeSearchConfig {
    pub fn any(&self) -> bool {
        self.google || self.bing
    }
}

/// Daily window during which the group's blocklist is suspended.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PauseWindowConfig {
    /// Weekday names ("mon".."sun"); empty means every day.
    #[serde(default)]
    pub days: Vec<String>,

    /// "HH:MM", local time.
    pub start: String,

    /// "HH:MM", local time. `end < start` wraps past midnight.
    pub end: String,
}

/// Static attributes of one client IP.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub group: Option<String>,
}

fn default_true() -> bool {
    true
}
