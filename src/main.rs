use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use vigil::config::{self, Config};
use vigil::discovery::{Health, InMemoryRegistry, StaticHealth};
use vigil::heartbeat::HeartbeatScheduler;
use vigil::metrics::start_metrics_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_or_default_config();

    if let Some(addr) = config.sandbox.metrics_addr.clone() {
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(&addr).await {
                error!(addr = %addr, error = %e, "Metrics server stopped");
            }
        });
    }

    // Heartbeat the sandbox services against an in-process registry
    let registry = Arc::new(InMemoryRegistry::new());
    let indicator = Arc::new(StaticHealth(
        Health::up().with_detail("mode", "sandbox"),
    ));
    let scheduler = Arc::new(HeartbeatScheduler::new(
        config.heartbeat.clone(),
        registry,
        indicator,
    ));

    for service_id in &config.sandbox.services {
        if let Err(e) = scheduler.add(service_id) {
            warn!(service_id = %service_id, error = %e, "Skipping service");
        }
    }

    let shutdown = CancellationToken::new();
    let handle = scheduler.clone().start(shutdown.clone());

    info!(
        services = scheduler.registry().len(),
        "Vigil sandbox running, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await?;

    shutdown.cancel();
    handle.await?;
    info!("Vigil stopped");
    Ok(())
}

fn load_or_default_config() -> Config {
    // Try to load from config file
    let config_paths = ["config/vigil.toml", "vigil.toml"];

    for path in config_paths {
        match config::load_config(path) {
            Ok(config) => {
                info!(path = path, "Loaded configuration");
                return config;
            }
            Err(e) => {
                warn!(path = path, error = %e, "Failed to load config");
            }
        }
    }

    info!("Using default configuration");
    Config::default()
}
