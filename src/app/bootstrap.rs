use std::sync::Arc;

use log::{error, info};
use tokio::sync::watch;

use crate::cache::{spawn_refresher, RefreshableCache};
use crate::cli::{Cli, Commands};
use crate::config::{load_network_tables, validate_config, Config};
use crate::error::Result;
use crate::fetch::{BinanceClient, UpstreamClient};
use crate::server::{self, AppState};

/// Entry point used by `main`.
pub async fn run(cli: Cli) -> Result<()> {
    let tables = load_network_tables(&cli.networks)?;
    let mut config = Config::from_env(tables)?;

    match cli.command() {
        Commands::CheckConfig => {
            validate_config(&config)?;
            println!(
                "Configuration OK: {} allowed networks, upstream {}",
                config.networks.allowed_networks.len(),
                config.base_url
            );
            Ok(())
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            validate_config(&config)?;
            serve_until_shutdown(config).await
        }
    }
}

async fn serve_until_shutdown(config: Config) -> Result<()> {
    let upstream: Arc<dyn UpstreamClient> = Arc::new(BinanceClient::new(
        &config.base_url,
        config.cache.fetch_timeout,
    )?);
    let upstream_name = upstream.name().to_string();
    let cache = RefreshableCache::new(upstream, config.credentials.clone(), config.cache);
    let settings = cache.settings();
    info!(
        "Upstream {upstream_name} at {}, cache window {:?}, fetch timeout {:?}, refresh every {:?}",
        config.base_url, settings.freshness_window, settings.fetch_timeout, config.refresh_interval
    );

    let policy = config.network_policy();
    info!("Exposing networks: {}", policy.allowed_networks().join(", "));
    let state = AppState::new(cache.clone(), policy);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = spawn_refresher(cache, config.refresh_interval, shutdown_rx);

    let shutdown = async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => {
                error!("Failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    };

    server::serve(&config, state, shutdown).await?;
    refresher.await?;
    Ok(())
}
