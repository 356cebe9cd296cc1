use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::adapters::PostgresStore;
use crate::config::AppConfig;
use crate::domain::performance_pct;
use crate::error::{IndexerError, Result};
use crate::pricing::PriceAggregator;
use crate::snapshot::{SnapshotPipeline, SnapshotScheduler};

#[derive(Parser)]
#[command(name = "axis-indexer")]
#[command(author = "Axis Team")]
#[command(version = "0.1.0")]
#[command(about = "Strategy index-price snapshot service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and per-environment overrides
    #[arg(short, long, default_value = "config", env = "AXIS_CONFIG_DIR")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Snapshot every strategy on each bucket boundary until stopped
    Run,
    /// Snapshot every strategy once and print the summary
    Once {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply database migrations
    Migrate,
    /// Show performance since deployment for a strategy
    Performance {
        /// Strategy ID
        strategy_id: String,
    },
    /// Fetch current prices for mints through the provider chain
    Prices {
        /// Mint addresses
        #[arg(required = true)]
        mints: Vec<String>,
    },
}

async fn connect(config: &AppConfig) -> Result<PostgresStore> {
    PostgresStore::new(&config.database.url, config.database.max_connections).await
}

pub async fn run_scheduler<F>(config: &AppConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let store = connect(config).await?;
    let pipeline = SnapshotPipeline::from_config(config, Arc::new(store))?;
    let scheduler = SnapshotScheduler::from_config(Arc::new(pipeline), &config.snapshot);

    scheduler.run(shutdown).await;
    Ok(())
}

pub async fn run_once(config: &AppConfig, json: bool) -> Result<()> {
    let store = connect(config).await?;
    let pipeline = SnapshotPipeline::from_config(config, Arc::new(store))?;
    let summary = pipeline.run_once().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

pub async fn migrate(config: &AppConfig) -> Result<()> {
    let store = connect(config).await?;
    store.migrate().await
}

pub async fn show_performance(config: &AppConfig, strategy_id: &str) -> Result<()> {
    let store = connect(config).await?;

    let baseline = store.get_baseline(strategy_id).await?.ok_or_else(|| {
        IndexerError::Validation(format!("strategy {strategy_id} has no baseline yet"))
    })?;
    let latest = store.latest_snapshot(strategy_id).await?.ok_or_else(|| {
        IndexerError::Validation(format!("strategy {strategy_id} has no snapshots"))
    })?;

    println!("Strategy:  {}", strategy_id);
    println!(
        "Baseline:  {:.6} at bucket {} ({})",
        baseline.baseline_price, baseline.baseline_ts_bucket_utc, baseline.baseline_confidence
    );
    println!(
        "Latest:    {:.6} at bucket {} ({})",
        latest.index_price, latest.ts_bucket_utc, latest.confidence
    );
    match performance_pct(&baseline, latest.index_price) {
        Some(pct) => println!("Change:    {:+.2}%", pct),
        None => println!("Change:    n/a (baseline was never priced)"),
    }
    Ok(())
}

pub async fn show_prices(config: &AppConfig, mints: &[String]) -> Result<()> {
    let aggregator = PriceAggregator::from_config(&config.providers)?;
    let ids: BTreeSet<String> = mints.iter().cloned().collect();

    info!("Fetching {} prices", ids.len());
    let prices = aggregator.fetch_prices(&ids).await;

    println!("{:<46} {:>16}  SOURCE", "MINT", "PRICE (USD)");
    for (mint, quote) in &prices {
        println!("{:<46} {:>16.8}  {}", mint, quote.price_usd, quote.source);
    }
    Ok(())
}
