//! Loss reporting subsystem.
//!
//! # Data Flow
//! ```text
//! ResultStore::window_counts(cluster, now - interval, now)
//!     → ReportWindow (total, failed, loss_ratio)
//!     → AlertState::evaluate (hysteresis, checkpointed to level_file_path)
//!     → alert / recovery / report notifications
//!     → StatusBoard + pinger_loss_ratio gauge
//! ```
//!
//! # Design Decisions
//! - One engine per cluster; each owns its alert state exclusively
//! - An empty window is skipped: no data, no alert
//! - Alerts fire on edges only, so a sustained outage alerts once

pub mod alert_state;
pub mod engine;
pub mod window;

pub use alert_state::{AlertCheckpoint, AlertState, CheckpointError, Transition};
pub use engine::{ReportEngine, TickOutcome};
pub use window::ReportWindow;
