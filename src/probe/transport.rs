//! Transport seam between probe workers and an RPC endpoint.

use async_trait::async_trait;
use thiserror::Error;

use crate::failover::Endpoint;

/// Fee parameters for one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    /// Priority-fee pricing.
    Priority { request_units: u32, compute_unit_price: u64 },
    /// Legacy pricing without a priority fee.
    Legacy { request_units: u32 },
}

impl FeeMode {
    pub fn request_units(&self) -> u32 {
        match self {
            FeeMode::Priority { request_units, .. } | FeeMode::Legacy { request_units } => *request_units,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeeMode::Priority { .. } => "priority",
            FeeMode::Legacy { .. } => "legacy",
        }
    }
}

/// Errors returned by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint rejected the transaction because of its fee parameters.
    #[error("fee rejected: {0}")]
    FeeRejected(String),

    /// Any other RPC-level failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The transaction landed but failed on-chain.
    #[error("transaction reverted: {0}")]
    Reverted(String),
}

/// Submits probe transactions and checks their confirmation.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Submit a probe transaction, returning its identifier.
    async fn submit(&self, endpoint: &Endpoint, fee: FeeMode) -> Result<String, TransportError>;

    /// Whether the transaction has been confirmed yet.
    async fn is_confirmed(&self, endpoint: &Endpoint, tx_id: &str) -> Result<bool, TransportError>;

    /// A submitted transaction was given up on before it confirmed.
    fn abandon(&self, _endpoint: &Endpoint, _tx_id: &str) {}
}
