//! Probe engine.
//!
//! # Data Flow
//! ```text
//! worker.rs (one loop per worker, batch per tick)
//!     → runner.rs run_probe()
//!         → FailoverPool::current()
//!         → transport.rs submit (tx_timeout) → poll confirmation (wait_confirmation_timeout)
//!         → FailoverPool::report_success / report_failure
//!     → sink.rs (ResultStore + MetricsSink)
//!     → notify (on failover)
//! ```
//!
//! # Design Decisions
//! - Probe-level errors never escape the worker; they become a failed PingResult
//! - Within a worker, batches are strictly sequential
//! - The transport is a trait so the engine runs against any RPC backend

pub mod result;
pub mod runner;
pub mod sink;
pub mod transport;
pub mod worker;

pub use result::{ErrorKind, PingResult};
pub use runner::{run_probe, ProbeOutcome, ProbeSettings};
pub use sink::ResultSink;
pub use transport::{FeeMode, ProbeTransport, TransportError};
pub use worker::ProbeWorkerPool;
