//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with cluster/endpoint fields on every event
//! - Metrics are cheap (atomic increments)
//! - A metrics outage never stops probing

pub mod logging;
pub mod metrics;

pub use self::metrics::{MetricsSink, PrometheusSink};
