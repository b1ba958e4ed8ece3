use std::path::Path;
use strata_dns_domain::Config;
use tracing::info;

pub fn load_config(
    config_path: Option<&Path>,
    overrides_path: Option<&Path>,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, overrides_path)?;

    info!(
        config_file = config_path.map(|p| p.display().to_string()).as_deref().unwrap_or("default"),
        listen = %config.server.listen,
        upstreams = config.upstreams.len(),
        l1_mode = ?config.cache.l1.mode,
        "Configuration loaded"
    );

    Ok(config)
}
