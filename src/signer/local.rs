//! Local private key signer implementation

use super::{TransactionSigner, TxReceipt, TxRequest};
use crate::constants::{RECEIPT_MAX_ATTEMPTS, RECEIPT_POLL_INTERVAL};
use crate::error::WalletError;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use eyre::{Context, Result};
use std::sync::Arc;

/// Local signer using a private key
///
/// A raw key is bound to whatever chain its RPC endpoint serves, so `switch_chain`
/// succeeds only when the endpoint already reports the requested chain.
pub struct LocalSigner {
    /// Provider with wallet filler - handles nonce, gas, chain_id, and signing
    provider: Arc<dyn Provider<Ethereum>>,
    address: Address,
}

impl LocalSigner {
    /// Create a new LocalSigner from a private key hex string
    ///
    /// # Arguments
    ///
    /// * `private_key` - Hex-encoded private key (with or without 0x prefix)
    /// * `rpc_url` - RPC endpoint URL
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let signer = LocalSigner::from_private_key("0x...", "https://rpc.example").await?;
    /// ```
    pub async fn from_private_key(
        private_key: impl AsRef<str>,
        rpc_url: impl AsRef<str>,
    ) -> Result<Self> {
        let key = private_key.as_ref();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let signer: PrivateKeySigner = key.parse().context("Failed to parse private key")?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url: Url = rpc_url.as_ref().parse().context("Invalid RPC URL")?;

        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            address,
        })
    }
}

impl LocalSigner {
    /// Returns the signer's EVM address
    pub fn address(&self) -> Address {
        self.address
    }
}

impl TransactionSigner for LocalSigner {
    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let actual = self
            .provider
            .get_chain_id()
            .await
            .context("Failed to get chain id")?;

        if actual != chain_id {
            return Err(WalletError::ChainMismatch {
                expected: chain_id,
                actual,
            }
            .into());
        }

        Ok(())
    }

    async fn sign_and_send(&self, tx: TxRequest) -> Result<TxHash> {
        let tx_request = alloy::rpc::types::TransactionRequest::default()
            .with_to(tx.to)
            .with_input(tx.data);

        // Provider fills nonce, gas, chain_id and signs
        let pending_tx = self
            .provider
            .send_transaction(tx_request)
            .await
            .context("Failed to send transaction")?;

        Ok(*pending_tx.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        for _ in 0..RECEIPT_MAX_ATTEMPTS {
            let receipt: Option<TransactionReceipt> = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .context("Failed to get transaction receipt")?;

            if let Some(receipt) = receipt {
                return Ok(TxReceipt {
                    tx_hash: receipt.transaction_hash,
                    block_number: receipt.block_number,
                    success: receipt.status(),
                });
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        eyre::bail!("Transaction receipt not found after timeout: {}", tx_hash)
    }
}
