//! Error definitions and RPC error classification.

use thiserror::Error;

use crate::probe::TransportError;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transaction was reverted on-chain.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Bad endpoint URL, access token or receiver address.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The endpoint refused the fee parameters.
    #[error("Fee rejected: {0}")]
    FeeRejected(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

impl From<BlockchainError> for TransportError {
    fn from(err: BlockchainError) -> Self {
        match err {
            BlockchainError::FeeRejected(msg) => TransportError::FeeRejected(msg),
            BlockchainError::Reverted(msg) => TransportError::Reverted(msg),
            other => TransportError::Rpc(other.to_string()),
        }
    }
}

/// Node error phrases that mean the fee parameters were refused.
const FEE_REJECTION_MARKERS: &[&str] = &[
    "transaction underpriced",
    "max priority fee per gas",
    "max fee per gas less than block base fee",
    "fee cap less than block base fee",
    "fee cap too low",
    "tip higher than fee cap",
    "tip above fee cap",
    "transaction type not supported",
    "eip-1559 transactions are not supported",
];

/// Whether an RPC error message means the node refused our fee parameters.
///
/// "replacement transaction underpriced" is a nonce collision with a pending
/// transaction, not a fee problem, and is excluded.
pub fn is_fee_rejection(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    if lower.contains("replacement transaction") {
        return false;
    }
    FEE_REJECTION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Classify a send error.
pub fn classify_send_error(message: String) -> BlockchainError {
    if is_fee_rejection(&message) {
        BlockchainError::FeeRejected(message)
    } else {
        BlockchainError::Rpc(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_rejection_markers() {
        assert!(is_fee_rejection("replacement transaction underpriced"));
        assert!(is_fee_rejection("max priority fee per gas higher than max fee per gas"));
        assert!(is_fee_rejection("Transaction type not supported"));
        assert!(is_fee_rejection("max fee per gas less than block base fee: maxFeePerGas: 1, baseFee: 7"));
        assert!(is_fee_rejection("tip higher than fee cap"));
        assert!(!is_fee_rejection("nonce too low"));
        assert!(!is_fee_rejection("connection refused"));
    }

    #[test]
    fn test_unrelated_errors_are_not_fee_rejections() {
        assert!(!is_fee_rejection("multiple requests in flight, retry later"));
        assert!(!is_fee_rejection("getMultipleAccounts not supported"));
        assert!(!is_fee_rejection("failed to estimate gas price oracle"));
        assert!(!is_fee_rejection("replacement transaction underpriced"));
        assert!(!is_fee_rejection("insufficient funds for gas * price + value"));
    }

    #[test]
    fn test_into_transport_error() {
        let err: TransportError = classify_send_error("transaction underpriced".into()).into();
        assert!(matches!(err, TransportError::FeeRejected(_)));

        let err: TransportError = BlockchainError::Rpc("boom".into()).into();
        assert_eq!(err, TransportError::Rpc("RPC error: boom".into()));

        let err: TransportError = BlockchainError::Reverted("0xabc".into()).into();
        assert!(matches!(err, TransportError::Reverted(_)));
    }
}
