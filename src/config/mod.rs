//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PingerConfig (validated, immutable)
//!     → handed to lifecycle::startup, which builds the AppContext
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Normalisation (API mode fallback) is an explicit function, not a side effect

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ApiConfig, ClusterConfig, ConnectionMode, DatabaseConfig, DiscordConfig, FailoverConfig,
    LoggingConfig, MetricsConfig, PingConfig, PingerConfig, ReportConfig, RetentionConfig,
    RpcEndpointConfig, SlackConfig, WebhookConfig,
};
