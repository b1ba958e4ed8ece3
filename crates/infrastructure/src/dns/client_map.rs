use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use strata_dns_domain::config::ClientConfig;
use strata_dns_domain::{GroupId, DEFAULT_GROUP};
use tracing::{info, warn};

#[derive(Default)]
struct ClientSnapshot {
    names: FxHashMap<IpAddr, Arc<str>>,
    groups: FxHashMap<IpAddr, GroupId>,
}

/// Maps a source address to a friendly name and a policy group.
///
/// Both maps are one copy-on-write snapshot; `apply_config` swaps it in
/// whole, so a reader sees either the old assignment set or the new one,
/// never a mix.
pub struct ClientMap {
    inner: ArcSwap<ClientSnapshot>,
    default_group: GroupId,
}

impl ClientMap {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(ClientSnapshot::default()),
            default_group: Arc::from(DEFAULT_GROUP),
        }
    }

    pub fn apply_config(&self, clients: &HashMap<String, ClientConfig>) {
        let mut snapshot = ClientSnapshot::default();
        for (address, client) in clients {
            let ip = match parse_client_ip(address) {
                Some(ip) => ip,
                None => {
                    warn!(address = %address, "Skipping unparseable client address");
                    continue;
                }
            };
            if let Some(name) = &client.name {
                snapshot.names.insert(ip, Arc::from(name.as_str()));
            }
            if let Some(group) = &client.group {
                snapshot.groups.insert(ip, Arc::from(group.as_str()));
            }
        }
        info!(clients = clients.len(), "Client map loaded");
        self.inner.store(Arc::new(snapshot));
    }

    /// Resolve `(name, group)` for a source IP. Unknown clients get their
    /// IP text as the name and the `default` group.
    pub fn identify(&self, source: IpAddr) -> (Arc<str>, GroupId) {
        let guard = self.inner.load();
        let name = guard
            .names
            .get(&source)
            .cloned()
            .unwrap_or_else(|| Arc::from(source.to_string()));
        let group = guard
            .groups
            .get(&source)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_group));
        (name, group)
    }
}

impl Default for ClientMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Config keys are IPs, but a stray `ip:port` form is tolerated.
fn parse_client_ip(address: &str) -> Option<IpAddr> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Some(ip);
    }
    address.parse::<SocketAddr>().ok().map(|sa| sa.ip())
}
