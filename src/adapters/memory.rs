//! In-process store used by integration tests and local dry runs.
//!
//! Mirrors the Postgres conflict rules: snapshots replace the row for their
//! bucket, baselines are kept from the first insert.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{BaselineRecord, SnapshotRecord, StrategyRow};
use crate::error::{IndexerError, Result};
use crate::persistence::{SnapshotStore, WriteStatement};

#[derive(Default)]
struct Tables {
    strategies: Vec<StrategyRow>,
    snapshots: BTreeMap<(String, i64), SnapshotRecord>,
    baselines: BTreeMap<String, BaselineRecord>,
}

/// Store backed by in-memory maps
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    batch_calls: AtomicUsize,
    failing_calls: RwLock<HashSet<usize>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategies(strategies: Vec<StrategyRow>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                strategies,
                ..Tables::default()
            }),
            ..Self::default()
        }
    }

    /// Seed a baseline as if an earlier deployment had written it
    pub async fn seed_baseline(&self, baseline: BaselineRecord) {
        self.tables
            .write()
            .await
            .baselines
            .insert(baseline.strategy_id.clone(), baseline);
    }

    /// Make the `call`-th `execute_batch` invocation (zero-based) fail
    pub async fn fail_batch_call(&self, call: usize) {
        self.failing_calls.write().await.insert(call);
    }

    /// Make every read and write fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self, strategy_id: &str, ts_bucket_utc: i64) -> Option<SnapshotRecord> {
        self.tables
            .read()
            .await
            .snapshots
            .get(&(strategy_id.to_string(), ts_bucket_utc))
            .cloned()
    }

    /// Every stored snapshot, ordered by strategy then bucket
    pub async fn snapshots(&self) -> Vec<SnapshotRecord> {
        self.tables.read().await.snapshots.values().cloned().collect()
    }

    /// Most recent snapshot of a strategy
    pub async fn latest_snapshot(&self, strategy_id: &str) -> Option<SnapshotRecord> {
        self.tables
            .read()
            .await
            .snapshots
            .values()
            .filter(|s| s.strategy_id == strategy_id)
            .max_by_key(|s| s.ts_bucket_utc)
            .cloned()
    }

    pub async fn baseline(&self, strategy_id: &str) -> Option<BaselineRecord> {
        self.tables.read().await.baselines.get(strategy_id).cloned()
    }

    pub async fn baseline_count(&self) -> usize {
        self.tables.read().await.baselines.len()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IndexerError::Internal("memory store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load_strategies(&self) -> Result<Vec<StrategyRow>> {
        self.ensure_available()?;
        Ok(self.tables.read().await.strategies.clone())
    }

    async fn execute_batch(&self, statements: &[WriteStatement]) -> Result<()> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        if self.failing_calls.read().await.contains(&call) {
            return Err(IndexerError::Internal(format!("injected failure on batch call {call}")));
        }

        let mut tables = self.tables.write().await;
        for statement in statements {
            match statement {
                WriteStatement::UpsertSnapshot(snapshot) => {
                    tables.snapshots.insert(
                        (snapshot.strategy_id.clone(), snapshot.ts_bucket_utc),
                        snapshot.clone(),
                    );
                }
                WriteStatement::InsertBaseline(baseline) => {
                    tables
                        .baselines
                        .entry(baseline.strategy_id.clone())
                        .or_insert_with(|| baseline.clone());
                }
            }
        }
        Ok(())
    }
}
