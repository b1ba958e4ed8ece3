use super::index::{BlockIndex, GroupOverlay, HostSet};
use super::source::{body_hash, fetch_source, parse_hosts, SourceState, SourceStatus};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::BlockFilterEngine;
use strata_dns_domain::config::{BlocklistConfig, ClientGroupConfig};
use strata_dns_domain::{CompiledPause, GroupId, ResolveError};
use tracing::{debug, error, info, warn};

struct EngineSettings {
    blocklist: BlocklistConfig,
    groups: Vec<ClientGroupConfig>,
}

/// The blocklist engine.
///
/// All filtering state lives in memory. The compiled `BlockIndex` is
/// swapped atomically via `ArcSwap` during `reload()`; readers never block.
/// Fetch state is kept per source URL so an unchanged body (same hash)
/// skips re-parsing and a failed fetch retains the last applied set.
pub struct BlocklistEngine {
    index: ArcSwap<BlockIndex>,
    settings: ArcSwap<EngineSettings>,
    sources: DashMap<String, SourceState>,
    http: reqwest::Client,
}

impl BlocklistEngine {
    pub fn new() -> Result<Self, ResolveError> {
        let http = reqwest::Client::builder()
            .user_agent("strata-dns (blocklist-sync)")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ResolveError::Internal(e.to_string()))?;
        Ok(Self {
            index: ArcSwap::from_pointee(BlockIndex::default()),
            settings: ArcSwap::from_pointee(EngineSettings {
                blocklist: BlocklistConfig::default(),
                groups: Vec::new(),
            }),
            sources: DashMap::new(),
            http,
        })
    }

    /// Install a new configuration and compile it immediately.
    pub async fn apply_config(
        &self,
        blocklist: BlocklistConfig,
        groups: Vec<ClientGroupConfig>,
    ) -> Result<(), ResolveError> {
        self.settings.store(Arc::new(EngineSettings { blocklist, groups }));
        self.recompile().await
    }

    pub fn source_state(&self, url: &str) -> Option<SourceState> {
        self.sources.get(url).map(|s| s.clone())
    }

    async fn recompile(&self) -> Result<(), ResolveError> {
        info!("Block filter compilation started");
        let settings = self.settings.load_full();

        let mut urls: Vec<&str> = settings.blocklist.sources.iter().map(|s| s.as_str()).collect();
        for group in &settings.groups {
            urls.extend(group.extra_sources.iter().map(|s| s.as_str()));
        }
        urls.sort_unstable();
        urls.dedup();

        join_all(urls.iter().map(|url| self.refresh_source(url))).await;

        let index = self.build_index(&settings);
        let total = index.total_blocked;
        self.index.store(Arc::new(index));
        info!(blocked_domains = total, "Block filter compiled and swapped");
        Ok(())
    }

    /// Fetch one source and update its state. Unchanged bodies (same hash)
    /// keep the previously parsed host set; failures keep the last applied
    /// set and flip the status to `Failed`.
    async fn refresh_source(&self, url: &str) {
        self.sources
            .entry(url.to_string())
            .or_default()
            .status = SourceStatus::Fetching;

        match fetch_source(&self.http, url).await {
            Ok(body) => {
                let hash = body_hash(&body);
                let mut state = self.sources.entry(url.to_string()).or_default();
                if state.last_applied_hash.as_deref() == Some(hash.as_str()) {
                    debug!(url = %url, "Blocklist source unchanged, skipping parse");
                } else {
                    let hosts = parse_hosts(&body);
                    debug!(url = %url, hosts = hosts.len(), "Blocklist source parsed");
                    state.hosts = Arc::new(hosts);
                    state.last_applied_hash = Some(hash);
                }
                state.status = SourceStatus::Applied;
                state.last_refresh = Some(Utc::now());
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Blocklist source fetch failed, keeping last applied set");
                let mut state = self.sources.entry(url.to_string()).or_default();
                state.status = SourceStatus::Failed;
            }
        }
    }

    fn build_index(&self, settings: &EngineSettings) -> BlockIndex {
        let mut global = HostSet::new();
        for url in &settings.blocklist.sources {
            if let Some(state) = self.sources.get(url.as_str()) {
                for host in state.hosts.iter() {
                    global.insert(host);
                }
            }
        }
        for entry in &settings.blocklist.denylist {
            global.insert(&normalize_entry(entry));
        }

        let mut global_allow = HostSet::new();
        for entry in &settings.blocklist.allowlist {
            global_allow.insert(&normalize_entry(entry));
        }

        let mut groups: FxHashMap<GroupId, GroupOverlay> = FxHashMap::default();
        for group in &settings.groups {
            let mut overlay = GroupOverlay {
                inherit_global: group.inherit_global,
                ..Default::default()
            };
            for entry in &group.allowlist {
                overlay.allow.insert(&normalize_entry(entry));
            }
            for entry in &group.denylist {
                overlay.deny.insert(&normalize_entry(entry));
            }
            for url in &group.extra_sources {
                if let Some(state) = self.sources.get(url.as_str()) {
                    for host in state.hosts.iter() {
                        overlay.deny.insert(host);
                    }
                }
            }
            for window in &group.scheduled_pause {
                match CompiledPause::parse(&window.days, &window.start, &window.end) {
                    Ok(pause) => overlay.pauses.push(pause),
                    Err(e) => {
                        warn!(group = %group.id, error = %e, "Skipping invalid pause window")
                    }
                }
            }
            groups.insert(Arc::from(group.id.as_str()), overlay);
        }

        let total_blocked = global.exact_len();
        BlockIndex {
            global,
            global_allow,
            groups,
            total_blocked,
        }
    }
}

#[async_trait]
impl BlockFilterEngine for BlocklistEngine {
    #[inline]
    fn is_blocked(&self, domain: &str, group: &str) -> bool {
        self.index.load().is_blocked(domain, group)
    }

    async fn reload(&self) -> Result<(), ResolveError> {
        self.recompile().await.map_err(|e| {
            error!(error = %e, "Block filter reload failed");
            e
        })
    }

    fn compiled_domain_count(&self) -> usize {
        self.index.load().total_blocked
    }
}

fn normalize_entry(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_ascii_lowercase()
}
