use serde::{Deserialize, Serialize};

/// Per-endpoint transport protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamProtocol {
    #[default]
    Udp,
    Tcp,
    Tls,
}

/// One upstream resolver endpoint. Endpoints are tried in configuration
/// order, skipping those currently marked degraded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// `host:port` socket address. Port 53 (853 for TLS) if omitted.
    pub address: String,

    #[serde(default)]
    pub protocol: UpstreamProtocol,

    /// TLS SNI name; defaults to the address host when unset.
    #[serde(default)]
    pub tls_hostname: Option<String>,
}

impl UpstreamConfig {
    pub fn default_pool() -> Vec<UpstreamConfig> {
        vec![
            UpstreamConfig {
                address: "1.1.1.1:53".to_string(),
                protocol: UpstreamProtocol::Udp,
                tls_hostname: None,
            },
            UpstreamConfig {
                address: "8.8.8.8:53".to_string(),
                protocol: UpstreamProtocol::Udp,
                tls_hostname: None,
            },
        ]
    }
}
