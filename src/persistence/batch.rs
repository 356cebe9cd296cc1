use tracing::{debug, error};

use super::{SnapshotStore, WriteStatement};
use crate::domain::{BaselineRecord, SnapshotRecord};
use crate::error::{IndexerError, Result};

/// Statements per batch unless configured otherwise
pub const DEFAULT_BATCH_LIMIT: usize = 50;

/// Outcome of a successful persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistReport {
    pub batches: usize,
    pub statements: usize,
}

/// Order a run's writes (snapshots, then baselines) and cut them into
/// batches of at most `limit` statements.
pub fn plan_batches(
    snapshots: Vec<SnapshotRecord>,
    baselines: Vec<BaselineRecord>,
    limit: usize,
) -> Vec<Vec<WriteStatement>> {
    let limit = limit.max(1);
    let statements: Vec<WriteStatement> = snapshots
        .into_iter()
        .map(WriteStatement::UpsertSnapshot)
        .chain(baselines.into_iter().map(WriteStatement::InsertBaseline))
        .collect();

    let mut batches = Vec::with_capacity(statements.len().div_ceil(limit));
    let mut iter = statements.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(limit).collect());
    }
    batches
}

/// Writes a run's records in size-bounded batches
#[derive(Debug, Clone, Copy)]
pub struct BatchWriter {
    batch_limit: usize,
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_LIMIT)
    }
}

impl BatchWriter {
    pub fn new(batch_limit: usize) -> Self {
        Self {
            batch_limit: batch_limit.max(1),
        }
    }

    /// Submit every batch in order.
    ///
    /// A failed batch does not stop the ones after it, and committed batches
    /// stay committed. Any failure turns the whole call into
    /// [`IndexerError::Persistence`] listing the failed batch indices.
    pub async fn persist<S>(
        &self,
        store: &S,
        snapshots: Vec<SnapshotRecord>,
        baselines: Vec<BaselineRecord>,
    ) -> Result<PersistReport>
    where
        S: SnapshotStore + ?Sized,
    {
        let batches = plan_batches(snapshots, baselines, self.batch_limit);
        let total_batches = batches.len();
        let statements = batches.iter().map(Vec::len).sum();

        let mut failed_batches = Vec::new();
        let mut first_error = None;

        for (index, batch) in batches.iter().enumerate() {
            match store.execute_batch(batch).await {
                Ok(()) => {
                    debug!(batch = index, size = batch.len(), "Batch committed");
                }
                Err(e) => {
                    error!(
                        batch = index,
                        size = batch.len(),
                        first_strategy = batch.first().map(WriteStatement::strategy_id),
                        "Batch write failed: {}",
                        e
                    );
                    failed_batches.push(index);
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        if let Some(reason) = first_error {
            return Err(IndexerError::Persistence {
                failed_batches,
                total_batches,
                reason,
            });
        }

        Ok(PersistReport {
            batches: total_batches,
            statements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Confidence, SNAPSHOT_VERSION};
    use crate::persistence::MockSnapshotStore;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn snapshot(id: usize) -> SnapshotRecord {
        SnapshotRecord {
            strategy_id: format!("s{id}"),
            ts_bucket_utc: 300,
            index_price: 1.0,
            prices: BTreeMap::new(),
            weights: BTreeMap::new(),
            sources: BTreeMap::new(),
            confidence: Confidence::Ok,
            version: SNAPSHOT_VERSION,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    fn records(n: usize) -> (Vec<SnapshotRecord>, Vec<BaselineRecord>) {
        let snapshots: Vec<_> = (0..n).map(snapshot).collect();
        let baselines = snapshots.iter().map(SnapshotRecord::baseline_candidate).collect();
        (snapshots, baselines)
    }

    #[test]
    fn test_plan_batches_respects_limit() {
        let (snapshots, baselines) = records(60);
        let batches = plan_batches(snapshots, baselines, 50);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![50, 50, 20]);
        assert!(batches.iter().all(|b| b.len() <= 50));
    }

    #[test]
    fn test_plan_batches_orders_snapshots_before_baselines() {
        let (snapshots, baselines) = records(2);
        let flat: Vec<_> = plan_batches(snapshots, baselines, 3).into_iter().flatten().collect();

        assert!(matches!(flat[0], WriteStatement::UpsertSnapshot(_)));
        assert!(matches!(flat[1], WriteStatement::UpsertSnapshot(_)));
        assert!(matches!(flat[2], WriteStatement::InsertBaseline(_)));
        assert!(matches!(flat[3], WriteStatement::InsertBaseline(_)));
        assert_eq!(flat[3].strategy_id(), "s1");
    }

    #[test]
    fn test_plan_batches_empty() {
        assert!(plan_batches(Vec::new(), Vec::new(), 50).is_empty());
    }

    #[tokio::test]
    async fn test_persist_submits_every_batch() {
        let (snapshots, baselines) = records(30);
        let mut store = MockSnapshotStore::new();
        store
            .expect_execute_batch()
            .withf(|batch: &[WriteStatement]| batch.len() <= 50)
            .times(2)
            .returning(|_| Ok(()));

        let report = BatchWriter::new(50)
            .persist(&store, snapshots, baselines)
            .await
            .unwrap();

        assert_eq!(report, PersistReport { batches: 2, statements: 60 });
    }

    #[tokio::test]
    async fn test_failed_batch_is_reported_and_later_batches_still_run() {
        let (snapshots, baselines) = records(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut store = MockSnapshotStore::new();
        store.expect_execute_batch().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                Err(IndexerError::Internal("disk full".into()))
            } else {
                Ok(())
            }
        });

        let err = BatchWriter::new(3)
            .persist(&store, snapshots, baselines)
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match err {
            IndexerError::Persistence {
                failed_batches,
                total_batches,
                reason,
            } => {
                assert_eq!(failed_batches, vec![1]);
                assert_eq!(total_batches, 4);
                assert!(reason.contains("disk full"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
