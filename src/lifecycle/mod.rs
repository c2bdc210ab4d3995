//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build AppContext → Spawn components
//!
//! Periodic tasks (periodic.rs):
//!     interval tick → task → (shutdown? exit : wait next tick)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop new batches/ticks → In-flight probes finish → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then store and metrics, then tasks
//! - In-flight probes are never aborted; they end within their own timeouts

pub mod periodic;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{AppContext, StartupError};
