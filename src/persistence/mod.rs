//! Persistence Layer for Snapshot Runs
//!
//! This module defines the store seam used by the pipeline:
//! - [`SnapshotStore`] reads strategies and applies statement batches
//! - [`BatchWriter`] cuts a run's writes into size-bounded batches
//!
//! Snapshot rows are upserted on `(strategy_id, ts_bucket_utc)`; baseline
//! rows are inserted only when the strategy has none yet. Both are safe to
//! replay, which is what lets overlapping runs go without a lock.

pub mod batch;

pub use batch::{plan_batches, BatchWriter, PersistReport, DEFAULT_BATCH_LIMIT};

use async_trait::async_trait;

use crate::domain::{BaselineRecord, SnapshotRecord, StrategyRow};
use crate::error::Result;

/// One write against the store
#[derive(Debug, Clone, PartialEq)]
pub enum WriteStatement {
    /// Insert or replace the row for `(strategy_id, ts_bucket_utc)`
    UpsertSnapshot(SnapshotRecord),
    /// Insert unless the strategy already has a baseline
    InsertBaseline(BaselineRecord),
}

impl WriteStatement {
    pub fn strategy_id(&self) -> &str {
        match self {
            WriteStatement::UpsertSnapshot(s) => &s.strategy_id,
            WriteStatement::InsertBaseline(b) => &b.strategy_id,
        }
    }
}

/// Storage backend for strategies, snapshots and baselines
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Every stored strategy
    async fn load_strategies(&self) -> Result<Vec<StrategyRow>>;

    /// Apply a batch of statements atomically
    async fn execute_batch(&self, statements: &[WriteStatement]) -> Result<()>;
}
