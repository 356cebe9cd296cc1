use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use super::SnapshotPipeline;
use crate::config::SnapshotConfig;

/// Time left until the next multiple of `bucket_seconds`, in `(0, bucket]`.
pub fn until_next_boundary(now_unix_millis: i64, bucket_seconds: i64) -> Duration {
    let bucket_millis = bucket_seconds.max(1) * 1000;
    let remaining = bucket_millis - now_unix_millis.rem_euclid(bucket_millis);
    Duration::from_millis(remaining as u64)
}

/// Runs the pipeline on bucket boundaries until shutdown
pub struct SnapshotScheduler {
    pipeline: Arc<SnapshotPipeline>,
    bucket_seconds: i64,
    interval: Duration,
}

impl SnapshotScheduler {
    pub fn new(pipeline: Arc<SnapshotPipeline>, bucket_seconds: i64, interval: Duration) -> Self {
        Self {
            pipeline,
            bucket_seconds,
            interval,
        }
    }

    pub fn from_config(pipeline: Arc<SnapshotPipeline>, config: &SnapshotConfig) -> Self {
        Self::new(
            pipeline,
            config.bucket_seconds,
            Duration::from_secs(config.interval_secs),
        )
    }

    /// Loop until `shutdown` resolves. Returns the number of runs started.
    ///
    /// Ticks that fire while a run is still going are skipped. A failed run
    /// is logged and the next tick proceeds as usual. Shutdown during a run
    /// abandons it; batches already committed stay committed.
    pub async fn run<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let delay = until_next_boundary(Utc::now().timestamp_millis(), self.bucket_seconds);
        info!(
            "Snapshot scheduler started: first run in {}s, then every {}s",
            delay.as_secs(),
            self.interval.as_secs()
        );

        let mut ticker = interval_at(Instant::now() + delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut runs = 0usize;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            runs += 1;
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Shutdown requested during a snapshot run; remaining batches skipped");
                    break;
                }
                result = self.pipeline.run_once() => {
                    if let Err(e) = result {
                        error!("Snapshot run failed: {}", e);
                    }
                }
            }
        }

        info!(runs, "Snapshot scheduler stopped");
        runs
    }
}
