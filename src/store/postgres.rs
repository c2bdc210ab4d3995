//! Postgres result store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::probe::PingResult;
use crate::store::{ResultStore, StoreError, StoreResult, WindowCounts};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ping_results (
    id            UUID PRIMARY KEY,
    cluster       TEXT        NOT NULL,
    endpoint      TEXT        NOT NULL,
    started_at    TIMESTAMPTZ NOT NULL,
    confirmed_at  TIMESTAMPTZ,
    latency_ms    BIGINT,
    success       BOOLEAN     NOT NULL,
    error_kind    TEXT
)"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS ping_results_cluster_started_at ON ping_results (cluster, started_at)";

/// Result store backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgResultStore {
    pool: Pool<Postgres>,
}

impl PgResultStore {
    /// Connect and make sure the results table exists.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        tracing::info!("Result store connected");
        Ok(store)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Connection(format!("schema setup failed: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn insert(&self, result: &PingResult) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO ping_results \
             (id, cluster, endpoint, started_at, confirmed_at, latency_ms, success, error_kind) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(result.id)
        .bind(&result.cluster)
        .bind(&result.endpoint_url)
        .bind(result.started_at)
        .bind(result.confirmed_at)
        .bind(result.latency_ms)
        .bind(result.success)
        .bind(result.error_kind.map(|k| k.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }

    async fn window_counts(
        &self,
        cluster: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<WindowCounts> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE NOT success) AS failed \
             FROM ping_results WHERE cluster = $1 AND started_at >= $2 AND started_at < $3",
        )
        .bind(cluster)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let total: i64 = row.try_get("total").map_err(|e| StoreError::Query(e.to_string()))?;
        let failed: i64 = row.try_get("failed").map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(WindowCounts {
            total: total.max(0) as u64,
            failed: failed.max(0) as u64,
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let done = sqlx::query("DELETE FROM ping_results WHERE started_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(done.rows_affected())
    }
}
