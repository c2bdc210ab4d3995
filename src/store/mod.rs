//! Result persistence.
//!
//! # Data Flow
//! ```text
//! ProbeWorkerPool → insert()            (append-only, concurrent)
//! ReportEngine    → window_counts()     (trailing report interval)
//! RetentionJob    → delete_older_than() (own schedule, own transaction)
//! ```
//!
//! # Design Decisions
//! - The store is a trait; Postgres in production, memory for tests and
//!   deployments without a database
//! - Deletes never share a transaction with writers

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::probe::PingResult;

pub use memory::MemoryStore;
pub use postgres::PgResultStore;

/// Errors raised by a result store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the database.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A query failed.
    #[error("store query failed: {0}")]
    Query(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Counts of results inside a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub total: u64,
    pub failed: u64,
}

/// Persistent home of probe results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Append a result.
    async fn insert(&self, result: &PingResult) -> StoreResult<()>;

    /// Count results of `cluster` with `from <= started_at < to`.
    async fn window_counts(
        &self,
        cluster: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<WindowCounts>;

    /// Delete results with `started_at < cutoff`, returning how many went.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}
