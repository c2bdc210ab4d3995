//! Alert hysteresis state and its restart checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result of feeding one window into the alert state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No change.
    None,
    /// Normal → alerting.
    Alert,
    /// Alerting → normal.
    Recovery,
}

/// Per-cluster hysteresis flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub currently_alerting: bool,
}

impl AlertState {
    /// Apply a window's loss ratio. Fires only on the edges.
    pub fn evaluate(&mut self, loss_ratio: f64, threshold: f64) -> Transition {
        let breached = loss_ratio >= threshold;
        match (self.currently_alerting, breached) {
            (false, true) => {
                self.currently_alerting = true;
                Transition::Alert
            }
            (true, false) => {
                self.currently_alerting = false;
                Transition::Recovery
            }
            _ => Transition::None,
        }
    }
}

/// Errors raised while reading or writing a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    cluster: String,
    #[serde(flatten)]
    state: AlertState,
    updated_at: DateTime<Utc>,
}

/// JSON file holding the alert flag across restarts.
#[derive(Debug, Clone)]
pub struct AlertCheckpoint {
    path: PathBuf,
    cluster: String,
}

impl AlertCheckpoint {
    pub fn new(path: impl Into<PathBuf>, cluster: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cluster: cluster.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved state. A missing file means "not alerting".
    pub fn load(&self) -> Result<AlertState, CheckpointError> {
        if !self.path.exists() {
            return Ok(AlertState::default());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let file: CheckpointFile = serde_json::from_reader(reader)?;
        if file.cluster != self.cluster {
            tracing::warn!(
                path = %self.path.display(),
                expected = %self.cluster,
                found = %file.cluster,
                "Checkpoint belongs to another cluster, ignoring"
            );
            return Ok(AlertState::default());
        }
        Ok(file.state)
    }

    /// Load, falling back to the default state on any error.
    pub fn load_or_default(&self) -> AlertState {
        match self.load() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read alert checkpoint");
                AlertState::default()
            }
        }
    }

    pub fn save(&self, state: AlertState) -> Result<(), CheckpointError> {
        let writer = BufWriter::new(File::create(&self.path)?);
        let file = CheckpointFile {
            cluster: self.cluster.clone(),
            state,
            updated_at: Utc::now(),
        };
        serde_json::to_writer(writer, &file)?;
        Ok(())
    }
}
