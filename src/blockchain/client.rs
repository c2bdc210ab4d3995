//! Alloy-backed probe transport.
//!
//! # Responsibilities
//! - Hold one provider per configured endpoint (with its bearer token)
//! - Build, sign and broadcast the zero-value probe transfer
//! - Price it with priority or legacy fees
//! - Check receipts for confirmation
//! - Keep the wallet nonce in step with the chain

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::Http;
use async_trait::async_trait;
use alloy::transports::http::reqwest;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::blockchain::types::{classify_send_error, BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;
use crate::failover::Endpoint;
use crate::probe::{FeeMode, ProbeTransport, TransportError};

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Sends probe transactions through whichever endpoint the pool selected.
pub struct RpcProbeClient {
    providers: HashMap<String, SharedProvider>,
    wallet: Wallet,
    receiver: Address,
    /// Serialises nonce resyncs between workers.
    sync_lock: Mutex<()>,
}

impl RpcProbeClient {
    /// Build providers for every endpoint. Probes go to `receiver`, or back
    /// to the wallet itself when none is given.
    pub fn new(wallet: Wallet, receiver: Option<&str>, endpoints: &[Arc<Endpoint>]) -> BlockchainResult<Self> {
        let receiver = match receiver.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => raw
                .parse::<Address>()
                .map_err(|e| BlockchainError::Config(format!("Invalid receiver address '{}': {}", raw, e)))?,
            None => wallet.address(),
        };

        let mut providers = HashMap::with_capacity(endpoints.len());
        for endpoint in endpoints {
            providers.insert(endpoint.url.clone(), connect(endpoint)?);
        }

        tracing::info!(
            address = %wallet.address(),
            receiver = %receiver,
            chain_id = wallet.chain_id(),
            endpoints = providers.len(),
            "Probe client initialized"
        );

        Ok(Self {
            providers,
            wallet,
            receiver,
            sync_lock: Mutex::new(()),
        })
    }

    pub fn receiver(&self) -> Address {
        self.receiver
    }

    fn provider(&self, endpoint: &Endpoint) -> BlockchainResult<&SharedProvider> {
        self.providers
            .get(&endpoint.url)
            .ok_or_else(|| BlockchainError::Config(format!("No provider for endpoint {}", endpoint.url)))
    }

    /// Read the mined nonce from chain into the wallet.
    ///
    /// `latest` rather than `pending`, so a nonce whose transaction never
    /// landed is reused instead of leaving a gap.
    pub async fn sync_nonce(&self, endpoint: &Endpoint) -> BlockchainResult<u64> {
        let provider = self.provider(endpoint)?;
        let _guard = self.sync_lock.lock().await;
        if self.wallet.is_synced() {
            return Ok(self.wallet.current_nonce());
        }

        let nonce = provider
            .get_transaction_count(self.wallet.address())
            .latest()
            .await
            .map_err(|e| BlockchainError::Rpc(format!("Failed to read nonce: {}", e)))?;
        self.wallet.set_nonce(nonce);
        tracing::debug!(endpoint = %endpoint.url, nonce = nonce, "Wallet nonce synced");
        Ok(nonce)
    }

    async fn send_probe(&self, endpoint: &Endpoint, fee: FeeMode) -> BlockchainResult<TxHash> {
        let provider = self.provider(endpoint)?;
        if !self.wallet.is_synced() {
            self.sync_nonce(endpoint).await?;
        }

        let gas_price = provider
            .get_gas_price()
            .await
            .map_err(|e| BlockchainError::Rpc(format!("Failed to read gas price: {}", e)))?;

        let tx = TransactionRequest::default()
            .with_from(self.wallet.address())
            .with_to(self.receiver)
            .with_value(U256::ZERO)
            .with_chain_id(self.wallet.chain_id())
            .with_gas_limit(u64::from(fee.request_units()))
            .with_nonce(self.wallet.get_and_increment_nonce());
        let guard = NonceGuard::new(&self.wallet);

        let tx = match fee {
            FeeMode::Priority { compute_unit_price, .. } => {
                let tip = u128::from(compute_unit_price);
                tx.with_max_priority_fee_per_gas(tip)
                    .with_max_fee_per_gas(gas_price.saturating_add(tip))
            }
            FeeMode::Legacy { .. } => tx.with_gas_price(gas_price),
        };

        let envelope = tx
            .build(&self.wallet.ethereum_wallet())
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        match provider.send_tx_envelope(envelope).await {
            Ok(pending) => {
                guard.disarm();
                Ok(*pending.tx_hash())
            }
            Err(e) => Err(classify_send_error(e.to_string())),
        }
    }

    async fn receipt_status(&self, endpoint: &Endpoint, tx_id: &str) -> BlockchainResult<bool> {
        let provider = self.provider(endpoint)?;
        let hash: TxHash = tx_id
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid transaction hash '{}': {}", tx_id, e)))?;

        let receipt = provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| BlockchainError::Rpc(e.to_string()))?;

        match receipt {
            Some(r) if r.status() => Ok(true),
            Some(_) => Err(BlockchainError::Reverted(tx_id.to_string())),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ProbeTransport for RpcProbeClient {
    async fn submit(&self, endpoint: &Endpoint, fee: FeeMode) -> Result<String, TransportError> {
        let hash = self.send_probe(endpoint, fee).await?;
        tracing::trace!(endpoint = %endpoint.url, tx = %hash, fee_mode = fee.label(), "Probe submitted");
        Ok(hash.to_string())
    }

    async fn is_confirmed(&self, endpoint: &Endpoint, tx_id: &str) -> Result<bool, TransportError> {
        Ok(self.receipt_status(endpoint, tx_id).await?)
    }

    fn abandon(&self, endpoint: &Endpoint, tx_id: &str) {
        // Dropped or stuck; resync so the next probe reuses its nonce.
        tracing::debug!(endpoint = %endpoint.url, tx = %tx_id, "Probe abandoned, resyncing nonce");
        self.wallet.mark_stale();
    }
}

/// Marks the wallet stale when dropped armed. A send that fails, or whose
/// future is cancelled by the submission timeout, may have burned a nonce
/// the node never saw.
struct NonceGuard<'a> {
    wallet: &'a Wallet,
    armed: bool,
}

impl<'a> NonceGuard<'a> {
    fn new(wallet: &'a Wallet) -> Self {
        Self { wallet, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for NonceGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.wallet.mark_stale();
        }
    }
}

impl std::fmt::Debug for RpcProbeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcProbeClient")
            .field("address", &self.wallet.address())
            .field("receiver", &self.receiver)
            .field("chain_id", &self.wallet.chain_id())
            .field("endpoints", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// HTTP provider for one endpoint, sending its access token as a bearer header.
fn connect(endpoint: &Endpoint) -> BlockchainResult<SharedProvider> {
    let url: url::Url = endpoint
        .url
        .parse()
        .map_err(|e| BlockchainError::Config(format!("Invalid RPC URL '{}': {}", endpoint.url, e)))?;

    let mut headers = HeaderMap::new();
    if let Some(token) = &endpoint.access_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| BlockchainError::Config(format!("Invalid access token for {}", endpoint.url)))?;
        headers.insert(AUTHORIZATION, value);
    }

    let http = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| BlockchainError::Config(format!("HTTP client error: {}", e)))?;

    let client = RpcClient::new(Http::with_client(http, url), false);
    Ok(Arc::new(ProviderBuilder::new().connect_client(client)) as SharedProvider)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn wallet() -> Wallet {
        Wallet::from_private_key(TEST_PRIVATE_KEY, 31337).unwrap()
    }

    fn endpoints() -> Vec<Arc<Endpoint>> {
        vec![
            Arc::new(Endpoint::new("http://localhost:8545", 1, 3)),
            Arc::new(Endpoint::new("http://localhost:8546", 2, 3).with_access_token("secret")),
        ]
    }

    #[test]
    fn test_receiver_defaults_to_wallet() {
        let client = RpcProbeClient::new(wallet(), None, &endpoints()).unwrap();
        assert_eq!(client.receiver(), wallet().address());

        let client = RpcProbeClient::new(wallet(), Some("  "), &endpoints()).unwrap();
        assert_eq!(client.receiver(), wallet().address());
    }

    #[test]
    fn test_explicit_receiver() {
        let receiver = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
        let client = RpcProbeClient::new(wallet(), Some(receiver), &endpoints()).unwrap();
        assert_eq!(client.receiver(), receiver.parse::<Address>().unwrap());
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(RpcProbeClient::new(wallet(), Some("not-an-address"), &endpoints()).is_err());

        let bad_url = vec![Arc::new(Endpoint::new("not a url", 1, 1))];
        assert!(RpcProbeClient::new(wallet(), None, &bad_url).is_err());
    }

    #[test]
    fn test_nonce_guard_marks_stale_unless_disarmed() {
        let wallet = wallet();
        wallet.set_nonce(3);
        drop(NonceGuard::new(&wallet));
        assert!(!wallet.is_synced());

        wallet.set_nonce(3);
        NonceGuard::new(&wallet).disarm();
        assert!(wallet.is_synced());
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_rpc_error() {
        let client = RpcProbeClient::new(wallet(), None, &endpoints()).unwrap();
        let stranger = Endpoint::new("http://elsewhere:8545", 1, 1);
        let err = client.is_confirmed(&stranger, "0x00").await.unwrap_err();
        assert!(matches!(err, TransportError::Rpc(_)));
    }
}
