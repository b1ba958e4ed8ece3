use serde::{Deserialize, Serialize};

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address the DNS listeners bind to.
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_true")]
    pub udp: bool,

    #[serde(default = "default_true")]
    pub tcp: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            udp: true,
            tcp: true,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:53".to_string()
}

fn default_true() -> bool {
    true
}
