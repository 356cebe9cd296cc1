//! Snapshot runs: building records, the per-run pipeline, and the scheduler
//! that drives it on bucket boundaries.

pub mod builder;
pub mod pipeline;
pub mod scheduler;

pub use builder::build_snapshot;
pub use pipeline::{RunSummary, SnapshotPipeline};
pub use scheduler::{until_next_boundary, SnapshotScheduler};
