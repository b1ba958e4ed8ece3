use super::{
    BlocklistConfig, CacheConfig, ClientConfig, ClientGroupConfig, ConfigError, LocalRecordConfig,
    QueryStoreConfig, RefreshConfig, ResolverConfig, SafeSearchConfig, ServerConfig, TracingConfig,
    UpstreamConfig,
};
use crate::DEFAULT_GROUP;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Root configuration. Every section has working defaults; a config file
/// only needs the keys it changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default = "UpstreamConfig::default_pool")]
    pub upstreams: Vec<UpstreamConfig>,

    #[serde(default)]
    pub blocklist: BlocklistConfig,

    #[serde(default)]
    pub client_groups: Vec<ClientGroupConfig>,

    /// IP address → client attributes.
    #[serde(default)]
    pub clients: HashMap<String, ClientConfig>,

    #[serde(default)]
    pub local_records: Vec<LocalRecordConfig>,

    #[serde(default)]
    pub query_store: QueryStoreConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub tracing: TracingConfig,

    /// Safe-search flags applied to the `default` group.
    #[serde(default)]
    pub safe_search: SafeSearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("empty config must deserialize")
    }
}

impl Config {
    /// Load from an optional base file with an optional overrides file on
    /// top. Later layers win key-by-key; unknown keys are ignored.
    pub fn load(
        path: Option<&Path>,
        overrides_path: Option<&Path>,
    ) -> Result<Config, ConfigError> {
        let mut value = serde_yaml::Value::Mapping(Default::default());
        for p in [path, overrides_path].into_iter().flatten() {
            let raw = std::fs::read_to_string(p).map_err(|source| ConfigError::Io {
                path: p.display().to_string(),
                source,
            })?;
            let layer: serde_yaml::Value = serde_yaml::from_str(&raw)?;
            merge_yaml(&mut value, layer);
        }
        let config: Config = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .listen
            .parse::<std::net::SocketAddr>()
            .map_err(|e| {
                ConfigError::Invalid(format!("server.listen '{}': {}", self.server.listen, e))
            })?;

        if self.upstreams.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one upstream endpoint is required".into(),
            ));
        }

        for record in &self.local_records {
            if !record.record_type.is_local_record_type() {
                return Err(ConfigError::Invalid(format!(
                    "local record '{}': type {} is not supported",
                    record.name, record.record_type
                )));
            }
        }

        if self.query_store.enabled && self.query_store.url.is_empty() {
            return Err(ConfigError::Invalid(
                "query_store.enabled requires query_store.url".into(),
            ));
        }

        Ok(())
    }

    /// Group definitions with the implicit `default` group guaranteed to be
    /// present (and impossible to delete via configuration).
    pub fn effective_groups(&self) -> Vec<ClientGroupConfig> {
        let mut groups = self.client_groups.clone();
        match groups.iter_mut().find(|g| g.id == DEFAULT_GROUP) {
            Some(default) => {
                if self.safe_search.any() && !default.safe_search.any() {
                    default.safe_search = self.safe_search;
                }
            }
            None => {
                groups.push(ClientGroupConfig {
                    id: DEFAULT_GROUP.to_string(),
                    name: None,
                    inherit_global: true,
                    extra_sources: Vec::new(),
                    allowlist: Vec::new(),
                    denylist: Vec::new(),
                    safe_search: self.safe_search,
                    scheduled_pause: Vec::new(),
                });
            }
        }
        groups
    }
}

/// Recursive mapping merge; scalars and sequences from the upper layer
/// replace the lower layer wholesale.
fn merge_yaml(base: &mut serde_yaml::Value, layer: serde_yaml::Value) {
    match (base, layer) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(layer_map)) => {
            for (key, layer_value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_yaml(base_value, layer_value),
                    None => {
                        base_map.insert(key, layer_value);
                    }
                }
            }
        }
        (base_slot, layer_value) => *base_slot = layer_value,
    }
}
