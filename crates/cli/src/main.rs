//! Strata DNS: a recursive-forwarding resolver with two-tier caching,
//! blocklist filtering, per-client-group policy, and async analytics.

mod bootstrap;
mod di;
mod server;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use strata_dns_infrastructure::dns::cache::coarse_clock;
use strata_dns_infrastructure::dns::server::DnsServerHandler;
use strata_dns_jobs::{BlocklistSyncJob, JobRunner, RefreshSweepJob};

#[derive(Parser)]
#[command(name = "strata-dns")]
#[command(version)]
#[command(about = "Recursive-forwarding DNS resolver with caching and blocklist filtering")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides file merged on top of the configuration
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Override the listen address from the command line
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::logging::init();

    let cli = Cli::parse();
    let mut config =
        bootstrap::config::load_config(cli.config.as_deref(), cli.overrides.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
        config.validate()?;
    }

    coarse_clock::start_clock_ticker();

    let ctx = di::build(&config).await?;

    JobRunner::new()
        .with_blocklist_sync(
            BlocklistSyncJob::new(ctx.block_filter.clone())
                .with_interval(config.blocklist.refresh_interval)
                .with_cancellation(ctx.shutdown.clone()),
        )
        .with_refresh_sweep(
            RefreshSweepJob::new(ctx.refresh.clone())
                .with_interval(config.refresh.sweep_interval_secs)
                .with_cancellation(ctx.shutdown.clone()),
        )
        .start()
        .await;

    let handler = DnsServerHandler::new(Arc::clone(&ctx.resolver));
    let shutdown = ctx.shutdown.clone();

    tokio::select! {
        result = server::dns::start_dns_server(&config.server, handler) => {
            shutdown.cancel();
            result
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
            Ok(())
        }
    }
}
