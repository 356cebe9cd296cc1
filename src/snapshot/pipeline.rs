use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use super::build_snapshot;
use crate::composition::CompositionParser;
use crate::config::AppConfig;
use crate::domain::{bucket_start, Confidence, SnapshotRecord, TokenEntry, BUCKET_SECONDS};
use crate::error::Result;
use crate::persistence::{BatchWriter, SnapshotStore};
use crate::pricing::PriceAggregator;
use crate::resolver::{SymbolTable, TokenResolver};

/// Outcome of one snapshot run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub ts_bucket: i64,
    pub strategies: usize,
    /// Distinct resolved mints across all strategies
    pub mints: usize,
    pub priced_mints: usize,
    pub ok: usize,
    pub partial: usize,
    pub fail: usize,
    pub batches: usize,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn empty(run_id: Uuid, ts_bucket: i64) -> Self {
        Self {
            run_id,
            ts_bucket,
            strategies: 0,
            mints: 0,
            priced_mints: 0,
            ok: 0,
            partial: 0,
            fail: 0,
            batches: 0,
            elapsed_ms: 0,
        }
    }

    fn count(&mut self, snapshots: &[SnapshotRecord]) {
        for snapshot in snapshots {
            match snapshot.confidence {
                Confidence::Ok => self.ok += 1,
                Confidence::Partial => self.partial += 1,
                Confidence::Fail => self.fail += 1,
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bucket {} | {} strategies | {}/{} mints priced | OK {} PARTIAL {} FAIL {} | {} batches in {}ms",
            self.ts_bucket,
            self.strategies,
            self.priced_mints,
            self.mints,
            self.ok,
            self.partial,
            self.fail,
            self.batches,
            self.elapsed_ms
        )
    }
}

/// One pass over every strategy: load, parse, price, build, persist.
pub struct SnapshotPipeline {
    store: Arc<dyn SnapshotStore>,
    parser: CompositionParser,
    aggregator: PriceAggregator,
    writer: BatchWriter,
    bucket_seconds: i64,
}

impl SnapshotPipeline {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        parser: CompositionParser,
        aggregator: PriceAggregator,
    ) -> Self {
        Self {
            store,
            parser,
            aggregator,
            writer: BatchWriter::default(),
            bucket_seconds: BUCKET_SECONDS,
        }
    }

    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.writer = BatchWriter::new(batch_limit);
        self
    }

    pub fn with_bucket_seconds(mut self, bucket_seconds: i64) -> Self {
        self.bucket_seconds = bucket_seconds;
        self
    }

    /// Wire the pipeline from configuration with the curated symbol table
    pub fn from_config(config: &AppConfig, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        let resolver = TokenResolver::new(Arc::new(SymbolTable::strict()));
        let aggregator = PriceAggregator::from_config(&config.providers)?;

        Ok(Self::new(store, CompositionParser::new(resolver), aggregator)
            .with_batch_limit(config.snapshot.batch_limit)
            .with_bucket_seconds(config.snapshot.bucket_seconds))
    }

    pub async fn run_once(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Run for the bucket containing `now`
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let ts_bucket = bucket_start(now.timestamp(), self.bucket_seconds);
        let span = info_span!("snapshot_run", %run_id, ts_bucket);

        self.execute(run_id, ts_bucket, now).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, ts_bucket: i64, now: DateTime<Utc>) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::empty(run_id, ts_bucket);

        let strategies = self.store.load_strategies().await?;
        if strategies.is_empty() {
            info!("No strategies to snapshot");
            return Ok(summary);
        }

        let parsed: Vec<(String, Vec<TokenEntry>)> = strategies
            .iter()
            .map(|row| (row.id.clone(), self.parser.parse_tokens(row)))
            .collect();

        let mints: BTreeSet<String> = parsed
            .iter()
            .flat_map(|(_, tokens)| tokens.iter().filter_map(|t| t.mint.clone()))
            .collect();
        debug!(strategies = parsed.len(), mints = mints.len(), "Compositions parsed");

        let prices = self.aggregator.fetch_prices(&mints).await;

        let snapshots: Vec<SnapshotRecord> = parsed
            .iter()
            .map(|(id, tokens)| build_snapshot(id, ts_bucket, tokens, &prices, now))
            .collect();
        let baselines = snapshots.iter().map(SnapshotRecord::baseline_candidate).collect();

        summary.strategies = snapshots.len();
        summary.mints = mints.len();
        summary.priced_mints = prices.values().filter(|q| q.is_priced()).count();
        summary.count(&snapshots);

        let report = self
            .writer
            .persist(self.store.as_ref(), snapshots, baselines)
            .await?;

        summary.batches = report.batches;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            strategies = summary.strategies,
            mints = summary.mints,
            priced_mints = summary.priced_mints,
            ok = summary.ok,
            partial = summary.partial,
            fail = summary.fail,
            batches = summary.batches,
            elapsed_ms = summary.elapsed_ms,
            "Snapshot run complete"
        );

        Ok(summary)
    }
}
