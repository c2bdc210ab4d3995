//! Endpoint failover subsystem.
//!
//! # Data Flow
//! ```text
//! Probe worker needs a target
//!     → pool.rs current() (lowest priority number that is not Failed)
//!     → probe runs against the endpoint
//!     → report_success / report_failure
//!     → endpoint.rs health state machine
//! ```
//!
//! # State Transitions
//! ```text
//! Active   → Degraded: a failure within the retry budget
//! Degraded → Failed:   consecutive_failures >= max_retry
//! any      → Active:   a success report
//! all Failed → Active: cool-down reset on the next selection
//! ```
//!
//! # Design Decisions
//! - One pool per cluster; health is mutated under a pool-scoped lock
//! - Reports are resets or increments, so interleaving from many workers is safe
//! - Failure counts may overshoot the budget by one under a race

pub mod endpoint;
pub mod pool;

pub use endpoint::{Endpoint, EndpointHealth, HealthStatus};
pub use pool::{EndpointSnapshot, FailoverEvent, FailoverPool, PoolError, PoolSnapshot};
