//! Wallet provider abstraction for the transaction SDK
//!
//! This module provides a trait-based abstraction for switching chains, signing and
//! sending transactions, and waiting for their receipts, so the confirmation pipeline
//! can run against a local private key or any other wallet backend.

mod local;

pub use local::LocalSigner;

use alloy::primitives::{Address, Bytes, TxHash};
use eyre::Result;

/// Transaction request parameters
#[derive(Debug, Clone)]
pub struct TxRequest {
    /// Target contract address
    pub to: Address,
    /// Encoded calldata
    pub data: Bytes,
}

impl TxRequest {
    /// Create a new transaction request
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
        }
    }
}

/// Minimal view of a mined transaction receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the transaction reverted
    pub success: bool,
}

/// Trait for wallet providers that can sign and send EVM transactions
///
/// Implementations should wrap user-declined requests in
/// [`WalletError::UserRejected`](crate::error::WalletError) so the coordinator can
/// classify broadcast failures.
pub trait TransactionSigner: Send + Sync {
    /// Switches the wallet to the given chain
    fn switch_chain(&self, chain_id: u64) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Signs and sends a transaction, returning the transaction hash
    fn sign_and_send(
        &self,
        tx: TxRequest,
    ) -> impl std::future::Future<Output = Result<TxHash>> + Send;

    /// Waits for a transaction to be included and returns its receipt
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl std::future::Future<Output = Result<TxReceipt>> + Send;
}
