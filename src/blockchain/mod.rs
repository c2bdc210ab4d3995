//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! PINGER_WALLET_PRIVATE_KEY
//!     → wallet.rs (key loading, local nonce counter)
//!     → client.rs (RpcProbeClient: one provider per endpoint, ProbeTransport impl)
//!     → types.rs (error taxonomy, fee-rejection classification)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or access tokens
//! - Probes are zero-value transfers; nothing else is ever signed

pub mod client;
pub mod types;
pub mod wallet;

pub use client::RpcProbeClient;
pub use types::{is_fee_rejection, BlockchainError, BlockchainResult};
pub use wallet::Wallet;
