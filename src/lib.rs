pub mod adapters;
pub mod cli;
pub mod composition;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod pricing;
pub mod resolver;
pub mod snapshot;

pub use adapters::{MemoryStore, PostgresStore};
pub use composition::{CompositionParser, CompositionPayload};
pub use config::AppConfig;
pub use domain::{
    bucket_start, performance_pct, BaselineRecord, Confidence, PriceMap, PriceQuote, PriceSource,
    SnapshotMetadata, SnapshotRecord, StrategyRow, TokenEntry, BUCKET_SECONDS,
};
pub use error::{IndexerError, Result};
pub use persistence::{BatchWriter, SnapshotStore, WriteStatement};
pub use pricing::{PriceAggregator, PriceProvider, ProviderQuotes};
pub use resolver::{SymbolTable, TokenResolver};
pub use snapshot::{build_snapshot, RunSummary, SnapshotPipeline, SnapshotScheduler};
