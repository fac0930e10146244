use std::time::Duration;

use tracing::{error, info};

use skyvault::{Config, Vault};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = skyvault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        skyvault::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("SkyVault metadata service");
    info!("Database: {}", config.database.path);
    info!("Chunk storage: {}", config.chunks.storage_path);

    let vault = match Vault::open(&config).await {
        Ok(vault) => vault,
        Err(e) => {
            error!("Failed to open vault: {}", e);
            std::process::exit(1);
        }
    };
    info!("Root folder is node {}", vault.metadata().root_id());

    let sweeper = if config.sweeper.enabled {
        match vault
            .metadata()
            .sweeper(Duration::from_secs(config.sweeper.interval_secs))
        {
            Ok(sweeper) => Some(sweeper.start()),
            Err(e) => {
                error!("Failed to start orphan sweeper: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");

    if let Some(handle) = sweeper {
        handle.stop().await;
    }
    vault.metadata().database().close().await;
}
