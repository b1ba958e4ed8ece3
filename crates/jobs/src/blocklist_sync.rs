use std::sync::Arc;
use std::time::Duration;
use strata_dns_application::ports::BlockFilterEngine;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Refetches blocklist sources on a fixed cadence and swaps in the
/// recompiled index. Sources whose body hash is unchanged skip the parse.
pub struct BlocklistSyncJob {
    engine: Arc<dyn BlockFilterEngine>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl BlocklistSyncJob {
    pub fn new(engine: Arc<dyn BlockFilterEngine>) -> Self {
        Self {
            engine,
            interval_secs: 86_400,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(60);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.interval_secs,
            "Starting blocklist sync job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("BlocklistSyncJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.engine.reload().await {
                            Ok(()) => info!(
                                blocked = self.engine.compiled_domain_count(),
                                "BlocklistSyncJob: reload completed"
                            ),
                            Err(e) => error!(error = %e, "BlocklistSyncJob: reload failed"),
                        }
                    }
                }
            }
        });
    }
}
