use std::sync::Arc;
use std::time::Duration;
use strata_dns_infrastructure::dns::refresh::RefreshEngine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodic sweeper: each tick scans the shared cache for entries whose
/// remaining TTL is below the refresh threshold and re-queries them,
/// hottest keys first.
pub struct RefreshSweepJob {
    engine: Arc<RefreshEngine>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl RefreshSweepJob {
    pub fn new(engine: Arc<RefreshEngine>) -> Self {
        Self {
            engine,
            interval_secs: 15,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.interval_secs,
            "Starting refresh sweep job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("RefreshSweepJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let refreshed = self.engine.sweep_once().await;
                        if refreshed > 0 {
                            info!(refreshed, "RefreshSweepJob: sweep completed");
                        } else {
                            debug!("RefreshSweepJob: nothing to refresh");
                        }
                    }
                }
            }
        });
    }
}
