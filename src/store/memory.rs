//! In-memory result store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::probe::PingResult;
use crate::store::{ResultStore, StoreResult, WindowCounts};

/// Keeps results in a vector. Used in tests and when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<PingResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Copy of every stored result.
    pub fn results(&self) -> Vec<PingResult> {
        self.rows().clone()
    }

    fn rows(&self) -> MutexGuard<'_, Vec<PingResult>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert(&self, result: &PingResult) -> StoreResult<()> {
        self.rows().push(result.clone());
        Ok(())
    }

    async fn window_counts(
        &self,
        cluster: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<WindowCounts> {
        let rows = self.rows();
        let mut counts = WindowCounts::default();
        for r in rows
            .iter()
            .filter(|r| r.cluster == cluster && r.started_at >= from && r.started_at < to)
        {
            counts.total += 1;
            if !r.success {
                counts.failed += 1;
            }
        }
        Ok(counts)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|r| r.started_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}
