use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use strata_dns_domain::config::{UpstreamConfig, UpstreamProtocol};
use strata_dns_domain::ResolveError;
use tracing::{debug, info};

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// healthy → degraded (K failures within W) → probing (after backoff)
/// → healthy | degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointPhase {
    Healthy,
    Degraded,
    Probing,
}

struct HealthState {
    phase: EndpointPhase,
    recent_failures: VecDeque<Instant>,
    retry_at: Instant,
    backoff: Duration,
}

/// One upstream resolver with its rolling health window.
pub struct UpstreamEndpoint {
    pub addr: SocketAddr,
    pub protocol: UpstreamProtocol,
    pub tls_name: String,
    pub display: Arc<str>,
    health: Mutex<HealthState>,
    failure_threshold: u32,
    failure_window: Duration,
}

impl UpstreamEndpoint {
    pub fn from_config(
        config: &UpstreamConfig,
        failure_threshold: u32,
        failure_window: Duration,
    ) -> Result<Self, ResolveError> {
        let addr = parse_addr(&config.address, config.protocol)?;
        let tls_name = config
            .tls_hostname
            .clone()
            .unwrap_or_else(|| addr.ip().to_string());
        let display: Arc<str> = Arc::from(format!("{:?}://{}", config.protocol, addr).to_lowercase());
        Ok(Self {
            addr,
            protocol: config.protocol,
            tls_name,
            display,
            health: Mutex::new(HealthState {
                phase: EndpointPhase::Healthy,
                recent_failures: VecDeque::new(),
                retry_at: Instant::now(),
                backoff: BACKOFF_BASE,
            }),
            failure_threshold,
            failure_window,
        })
    }

    /// Whether the endpoint may be tried right now. A degraded endpoint
    /// whose backoff has elapsed transitions to probing and gets one shot.
    pub fn is_available(&self) -> bool {
        let mut health = self.health.lock().unwrap();
        match health.phase {
            EndpointPhase::Healthy | EndpointPhase::Probing => true,
            EndpointPhase::Degraded => {
                if Instant::now() >= health.retry_at {
                    debug!(endpoint = %self.display, "Endpoint entering probe");
                    health.phase = EndpointPhase::Probing;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn phase(&self) -> EndpointPhase {
        self.health.lock().unwrap().phase
    }

    pub fn on_success(&self) {
        let mut health = self.health.lock().unwrap();
        if health.phase != EndpointPhase::Healthy {
            info!(endpoint = %self.display, "Endpoint recovered");
        }
        health.phase = EndpointPhase::Healthy;
        health.recent_failures.clear();
        health.backoff = BACKOFF_BASE;
    }

    pub fn on_failure(&self) {
        let now = Instant::now();
        let mut health = self.health.lock().unwrap();

        health.recent_failures.push_back(now);
        while let Some(&oldest) = health.recent_failures.front() {
            if now.duration_since(oldest) > self.failure_window {
                health.recent_failures.pop_front();
            } else {
                break;
            }
        }

        let failed_probe = health.phase == EndpointPhase::Probing;
        if failed_probe || health.recent_failures.len() >= self.failure_threshold as usize {
            let backoff = health.backoff;
            health.phase = EndpointPhase::Degraded;
            health.retry_at = now + backoff;
            health.backoff = (backoff * 2).min(BACKOFF_MAX);
            info!(endpoint = %self.display, backoff = ?backoff, "Endpoint degraded");
        }
    }
}

fn parse_addr(address: &str, protocol: UpstreamProtocol) -> Result<SocketAddr, ResolveError> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }
    // Bare IP: apply the protocol's default port.
    let default_port = match protocol {
        UpstreamProtocol::Tls => 853,
        _ => 53,
    };
    address
        .parse::<std::net::IpAddr>()
        .map(|ip| SocketAddr::new(ip, default_port))
        .map_err(|_| ResolveError::Internal(format!("invalid upstream address '{}'", address)))
}
