use axis_indexer::cli::{self, Cli, Commands};
use axis_indexer::config::AppConfig;
use axis_indexer::error::{IndexerError, Result};
use axis_indexer::logging::init_logging;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    config.validate().map_err(IndexerError::InvalidConfig)?;

    let _log_guard = init_logging(&config.logging);

    match &cli.command {
        Commands::Run => {
            info!("Starting snapshot service");
            cli::run_scheduler(&config, shutdown_signal()).await?;
            info!("Shutdown complete");
        }
        Commands::Once { json } => cli::run_once(&config, *json).await?,
        Commands::Migrate => cli::migrate(&config).await?,
        Commands::Performance { strategy_id } => {
            cli::show_performance(&config, strategy_id).await?
        }
        Commands::Prices { mints } => cli::show_prices(&config, mints).await?,
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
