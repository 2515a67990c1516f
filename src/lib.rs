//! Orderbook transaction SDK for Rust
//!
//! Tracks orderbook actions from wallet confirmation to subgraph indexing. A mined
//! transaction is not considered done until the subgraph reflects it, so reads made
//! after `Success` see the new state.
//!
//! # Features
//!
//! - Wallet confirmation (chain switch + broadcast) with rejection classification
//! - Per-transaction state machine observable through `tokio::sync::watch`
//! - Bounded-retry subgraph polling with cancellation
//! - Registry that invalidates cached queries and notifies on terminal states
//!
//! # Example
//!
//! ```rust,ignore
//! use orderbook_tx_sdk::{
//!     DepositArgs, LocalSigner, NetworkConfig, SubgraphClient, TransactionRegistry,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = NetworkConfig::from_env()?;
//!     let signer = LocalSigner::from_private_key("0x...", &config.rpc_url).await?;
//!     let registry =
//!         TransactionRegistry::new(Arc::new(signer), Arc::new(SubgraphClient::new()?), config);
//!
//!     let handle = registry.create_deposit_transaction(DepositArgs {
//!         calldata: deposit_calldata,
//!         vault_id: "0x01".to_string(),
//!     });
//!     let record = handle.wait().await;
//!     println!("{}: {}", record.state, record.message);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod explorer;
pub mod indexing;
pub mod machine;
pub mod notify;
pub mod registry;
pub mod signer;
pub mod subgraph;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod test_utils;

// Re-export main types for convenience
pub use config::{NetworkConfig, PollConfig};
pub use error::{eyre, Context, Report, Result, TransactionErrorKind, WalletError};
pub use explorer::{explorer_link, ExplorerKind};
pub use indexing::{await_convergence, IndexedValue, IndexingError, IndexingResult, PollRequest};
pub use machine::{Submission, TransactionStateMachine};
pub use notify::{
    LogInvalidator, LogNotifier, Notification, NotificationKind, NotificationSink,
    QueryInvalidator,
};
pub use registry::{
    AddOrderArgs, DepositArgs, RemoveOrderArgs, TransactionHandle, TransactionId,
    TransactionRegistry, WithdrawalArgs,
};
pub use signer::{LocalSigner, TransactionSigner, TxReceipt, TxRequest};
pub use subgraph::{SubgraphClient, SubgraphSource};
pub use types::{RecordUpdate, TransactionKind, TransactionRecord, TransactionState};
pub use wallet::{
    ConfirmArgs, RejectionCause, WalletConfirmation, WalletConfirmationCoordinator, WalletState,
};
