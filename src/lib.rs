//! RPC endpoint pinger library

pub mod config;
pub mod failover;
pub mod probe;
pub mod blockchain;
pub mod store;
pub mod report;
pub mod retention;
pub mod status;
pub mod notify;
pub mod api;
pub mod lifecycle;
pub mod observability;

pub use config::schema::PingerConfig;
pub use failover::FailoverPool;
pub use lifecycle::{AppContext, Shutdown};
