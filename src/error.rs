//! Error types for the orderbook transaction SDK
//!
//! Fallible I/O (signers, subgraph, config) uses `eyre` for ergonomic error handling
//! with context. Terminal pipeline failures are reported as a tagged
//! [`TransactionErrorKind`] instead, since nothing is propagated past the state machine.

pub use eyre::{eyre, Context, Report, Result};

/// Terminal failure kinds a transaction can end with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionErrorKind {
    /// Wallet could not switch to the target chain
    #[error("chain switch failed")]
    ChainSwitchFailed,
    /// Broadcast failed (user decline or provider fault)
    #[error("transaction rejected")]
    TransactionRejected,
    /// The chain did not produce a receipt
    #[error("failed to get transaction receipt")]
    ReceiptWaitFailed,
    /// Poller exhausted its attempt budget
    #[error("subgraph indexing timed out")]
    IndexingTimeout,
    /// Poller converged on a value of unexpected shape
    #[error("unknown error during indexing")]
    IndexingUnknown,
    /// Poll was cancelled by its owner
    #[error("indexing cancelled")]
    IndexingCancelled,
}

/// Errors a wallet provider can tag its failures with
///
/// Signers return `eyre::Report`; wrapping the root cause in a `WalletError` lets the
/// coordinator tell a user decline apart from an infrastructure fault.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The user declined the request in their wallet
    #[error("user rejected the request")]
    UserRejected,
    /// The wallet is connected to a different chain and cannot switch
    #[error("wallet is on chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
}
