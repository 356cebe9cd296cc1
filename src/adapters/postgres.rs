use crate::domain::{BaselineRecord, Confidence, SnapshotRecord, StrategyRow};
use crate::error::{IndexerError, Result};
use crate::persistence::{SnapshotStore, WriteStatement};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, instrument};

/// Latest persisted valuation of a strategy
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub strategy_id: String,
    pub ts_bucket_utc: i64,
    pub index_price: f64,
    pub confidence: Confidence,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    // ==================== Strategies ====================

    /// Load every strategy. Payload columns are read as text whatever their
    /// declared type.
    #[instrument(skip(self))]
    pub async fn fetch_strategies(&self) -> Result<Vec<StrategyRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id::text AS id,
                   composition::text AS composition,
                   config::text AS config
            FROM strategies
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let strategies: Vec<StrategyRow> = rows
            .iter()
            .map(|r| StrategyRow {
                id: r.get("id"),
                composition: r.get("composition"),
                config: r.get("config"),
            })
            .collect();

        debug!("Loaded {} strategies", strategies.len());
        Ok(strategies)
    }

    // ==================== Snapshots ====================

    async fn upsert_snapshot(
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &SnapshotRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO strategy_price_snapshots (
                strategy_id, ts_bucket_utc, index_price, prices_json, weights_json,
                source_json, confidence, version, metadata_json, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (strategy_id, ts_bucket_utc) DO UPDATE SET
                index_price = EXCLUDED.index_price,
                prices_json = EXCLUDED.prices_json,
                weights_json = EXCLUDED.weights_json,
                source_json = EXCLUDED.source_json,
                confidence = EXCLUDED.confidence,
                version = EXCLUDED.version,
                metadata_json = EXCLUDED.metadata_json,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&snapshot.strategy_id)
        .bind(snapshot.ts_bucket_utc)
        .bind(snapshot.index_price)
        .bind(snapshot.prices_json()?)
        .bind(snapshot.weights_json()?)
        .bind(snapshot.sources_json()?)
        .bind(snapshot.confidence.as_str())
        .bind(snapshot.version)
        .bind(snapshot.metadata_json()?)
        .bind(snapshot.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Most recent snapshot of a strategy
    pub async fn latest_snapshot(&self, strategy_id: &str) -> Result<Option<StoredSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT strategy_id, ts_bucket_utc, index_price, confidence, metadata_json, created_at
            FROM strategy_price_snapshots
            WHERE strategy_id = $1
            ORDER BY ts_bucket_utc DESC
            LIMIT 1
            "#,
        )
        .bind(strategy_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(StoredSnapshot {
                strategy_id: r.get("strategy_id"),
                ts_bucket_utc: r.get("ts_bucket_utc"),
                index_price: r.get("index_price"),
                confidence: parse_confidence(r.get("confidence"))?,
                metadata: r.get("metadata_json"),
                created_at: r.get("created_at"),
            })
        })
        .transpose()
    }

    // ==================== Baselines ====================

    async fn insert_baseline(
        tx: &mut Transaction<'_, Postgres>,
        baseline: &BaselineRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO strategy_deployment_baseline (
                strategy_id, baseline_ts_bucket_utc, baseline_price, baseline_confidence, created_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (strategy_id) DO NOTHING
            "#,
        )
        .bind(&baseline.strategy_id)
        .bind(baseline.baseline_ts_bucket_utc)
        .bind(baseline.baseline_price)
        .bind(baseline.baseline_confidence.as_str())
        .bind(baseline.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Baseline of a strategy, if one was ever recorded
    pub async fn get_baseline(&self, strategy_id: &str) -> Result<Option<BaselineRecord>> {
        let row = sqlx::query(
            r#"
            SELECT strategy_id, baseline_ts_bucket_utc, baseline_price, baseline_confidence, created_at
            FROM strategy_deployment_baseline
            WHERE strategy_id = $1
            "#,
        )
        .bind(strategy_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(BaselineRecord {
                strategy_id: r.get("strategy_id"),
                baseline_ts_bucket_utc: r.get("baseline_ts_bucket_utc"),
                baseline_price: r.get("baseline_price"),
                baseline_confidence: parse_confidence(r.get("baseline_confidence"))?,
                created_at: r.get("created_at"),
            })
        })
        .transpose()
    }
}

fn parse_confidence(raw: &str) -> Result<Confidence> {
    Confidence::try_from(raw).map_err(IndexerError::Validation)
}

#[async_trait]
impl SnapshotStore for PostgresStore {
    async fn load_strategies(&self) -> Result<Vec<StrategyRow>> {
        self.fetch_strategies().await
    }

    /// One transaction per batch; a failing statement rolls back only its batch.
    async fn execute_batch(&self, statements: &[WriteStatement]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for statement in statements {
            match statement {
                WriteStatement::UpsertSnapshot(snapshot) => {
                    Self::upsert_snapshot(&mut tx, snapshot).await?
                }
                WriteStatement::InsertBaseline(baseline) => {
                    Self::insert_baseline(&mut tx, baseline).await?
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
