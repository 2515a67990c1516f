//! Per-transaction state machine
//!
//! One [`TransactionStateMachine`] tracks one submitted action from wallet confirmation
//! through receipt wait to subgraph convergence. Its state lives in a
//! `tokio::sync::watch` channel; every update is merged onto the current snapshot so
//! fields like the explorer link survive later transitions.
//!
//! ```text
//! Idle -> [PendingWallet] -> Pending<Action> -> PendingSubgraph -> Success | Error
//! ```

use crate::config::PollConfig;
use crate::constants::*;
use crate::error::TransactionErrorKind;
use crate::explorer::{explorer_link, explorer_link_with_base, ExplorerKind};
use crate::indexing::{await_convergence, IndexingError, IndexingResult, PollRequest};
use crate::signer::TransactionSigner;
use crate::subgraph::{SgAddOrder, SgRemoveOrder, SgTransaction, SubgraphSource};
use crate::types::{RecordUpdate, TransactionKind, TransactionRecord, TransactionState};
use crate::wallet::{ConfirmArgs, WalletConfirmationCoordinator, WalletState};
use alloy::primitives::{Address, Bytes, TxHash};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Callback invoked with the terminal snapshot
pub type TerminalCallback = Box<dyn FnOnce(&TransactionRecord) + Send>;

/// How the transaction reaches the chain
#[derive(Debug, Clone)]
pub enum Submission {
    /// The machine asks the wallet to switch chain and broadcast
    Wallet { to: Address, calldata: Bytes },
    /// Already confirmed in the wallet upstream
    Broadcast(TxHash),
}

#[derive(Default)]
struct TerminalCallbacks {
    on_success: Option<TerminalCallback>,
    on_error: Option<TerminalCallback>,
}

/// How a convergence poll ended, from the machine's point of view
enum IndexingOutcome {
    Converged {
        message: String,
        order_hash: Option<String>,
    },
    Failed(IndexingError),
    /// Converged on something the kind did not expect
    Unexpected,
}

impl IndexingOutcome {
    fn from_result<T>(result: IndexingResult<T>, require_order_hash: bool) -> Self {
        match result {
            IndexingResult::Value(value) if require_order_hash && value.order_hash.is_none() => {
                IndexingOutcome::Unexpected
            }
            IndexingResult::Value(value) => IndexingOutcome::Converged {
                message: value.success_message,
                order_hash: value.order_hash,
            },
            IndexingResult::Error(err) => IndexingOutcome::Failed(err),
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State machine for a single transaction
pub struct TransactionStateMachine<S: TransactionSigner, I: SubgraphSource> {
    signer: Arc<S>,
    subgraph: Arc<I>,
    poll: PollConfig,
    explorer_url: Option<String>,
    network: Option<String>,
    cancellation: CancellationToken,
    state: watch::Sender<TransactionRecord>,
    callbacks: Mutex<TerminalCallbacks>,
}

impl<S: TransactionSigner, I: SubgraphSource> TransactionStateMachine<S, I> {
    /// Create a machine in the `Idle` state
    pub fn new(signer: Arc<S>, subgraph: Arc<I>, record: TransactionRecord) -> Self {
        let (state, _) = watch::channel(record);
        Self {
            signer,
            subgraph,
            poll: PollConfig::default(),
            explorer_url: None,
            network: None,
            cancellation: CancellationToken::new(),
            state,
            callbacks: Mutex::new(TerminalCallbacks::default()),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Use a specific explorer instead of the chain's default
    pub fn with_explorer_url(mut self, explorer_url: impl Into<String>) -> Self {
        self.explorer_url = Some(explorer_url.into());
        self
    }

    /// Network tag carried on the indexing result
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn on_success(self, callback: impl FnOnce(&TransactionRecord) + Send + 'static) -> Self {
        lock(&self.callbacks).on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(self, callback: impl FnOnce(&TransactionRecord) + Send + 'static) -> Self {
        lock(&self.callbacks).on_error = Some(Box::new(callback));
        self
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<TransactionRecord> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TransactionRecord {
        self.state.borrow().clone()
    }

    /// Token that stops subgraph polling when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    fn kind(&self) -> TransactionKind {
        self.state.borrow().kind
    }

    fn explorer_link(&self, hash: TxHash) -> Option<String> {
        match &self.explorer_url {
            Some(base) => Some(explorer_link_with_base(base, hash, ExplorerKind::Tx)),
            None => explorer_link(hash, self.state.borrow().chain_id, ExplorerKind::Tx),
        }
    }

    fn update(&self, update: RecordUpdate) -> bool {
        let next = update.state;
        let applied = self.state.send_if_modified(|record| record.apply(update));
        if applied {
            tracing::debug!("{:?} transaction -> {}", self.kind(), next);
        } else {
            tracing::warn!(
                "Ignoring out-of-order transition to {} from {}",
                next,
                self.state.borrow().state
            );
        }
        applied
    }

    fn enter_pending(&self, hash: TxHash) {
        let kind = self.kind();
        self.update(
            RecordUpdate::state(kind.pending_state())
                .with_message(kind.pending_message())
                .with_tx_hash(hash)
                .with_explorer_link(self.explorer_link(hash)),
        );
    }

    /// Apply the terminal update and fire the matching callback
    fn finish(&self, update: RecordUpdate) -> TransactionRecord {
        let success = update.state == TransactionState::Success;
        let applied = self.update(update);
        let record = self.snapshot();
        if !applied {
            return record;
        }

        let callbacks = std::mem::take(&mut *lock(&self.callbacks));
        let callback = if success {
            callbacks.on_success
        } else {
            callbacks.on_error
        };
        if let Some(callback) = callback {
            callback(&record);
        }
        record
    }

    fn fail(&self, message: impl Into<String>, error: TransactionErrorKind) -> TransactionRecord {
        self.finish(
            RecordUpdate::state(TransactionState::Error)
                .with_message(message)
                .with_error(error),
        )
    }

    /// Drive the transaction to a terminal state and return the final snapshot
    pub async fn run(self, submission: Submission) -> TransactionRecord {
        let tx_hash = match submission {
            Submission::Broadcast(hash) => {
                self.enter_pending(hash);
                hash
            }
            Submission::Wallet { to, calldata } => match self.confirm_in_wallet(to, calldata).await {
                Ok(hash) => hash,
                Err(record) => return record,
            },
        };

        match self.signer.wait_for_receipt(tx_hash).await {
            Ok(receipt) if receipt.success => {}
            Ok(_) => {
                tracing::warn!("Transaction {} reverted", tx_hash);
                return self.fail(MSG_TX_REVERTED, TransactionErrorKind::ReceiptWaitFailed);
            }
            Err(err) => {
                tracing::warn!("Failed to get receipt for {}: {:#}", tx_hash, err);
                return self.fail(MSG_RECEIPT_FAILED, TransactionErrorKind::ReceiptWaitFailed);
            }
        }

        self.update(
            RecordUpdate::state(TransactionState::PendingSubgraph).with_message(MSG_PENDING_SUBGRAPH),
        );

        let kind = self.kind();
        match self.await_indexing(kind, tx_hash).await {
            IndexingOutcome::Converged {
                message,
                order_hash,
            } => self.finish(
                RecordUpdate::state(TransactionState::Success)
                    .with_message(message)
                    .with_order_hash(order_hash),
            ),
            IndexingOutcome::Failed(IndexingError::Timeout) => {
                self.fail(kind.timeout_message(), TransactionErrorKind::IndexingTimeout)
            }
            IndexingOutcome::Failed(IndexingError::Cancelled) => {
                self.fail(MSG_INDEXING_CANCELLED, TransactionErrorKind::IndexingCancelled)
            }
            IndexingOutcome::Unexpected => {
                tracing::warn!("Transaction {} indexed with an unexpected shape", tx_hash);
                self.fail(MSG_INDEXING_UNKNOWN, TransactionErrorKind::IndexingUnknown)
            }
        }
    }

    /// Returns the terminal record in `Err` when the wallet step fails
    async fn confirm_in_wallet(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> Result<TxHash, TransactionRecord> {
        self.update(
            RecordUpdate::state(TransactionState::PendingWallet).with_message(MSG_PENDING_WALLET),
        );

        let coordinator = WalletConfirmationCoordinator::new(Arc::clone(&self.signer));
        let chain_id = self.state.borrow().chain_id;
        let confirmation = coordinator
            .confirm(ConfirmArgs {
                chain_id,
                to,
                calldata,
                on_confirm: |hash| self.enter_pending(hash),
            })
            .await;

        if let Some(hash) = confirmation.confirmed_hash() {
            return Ok(hash);
        }

        match confirmation.state {
            WalletState::Error { .. } => Err(self.fail(
                MSG_CHAIN_SWITCH_FAILED,
                TransactionErrorKind::ChainSwitchFailed,
            )),
            WalletState::Rejected { reason, .. } => {
                Err(self.fail(reason, TransactionErrorKind::TransactionRejected))
            }
            WalletState::Confirmed => Err(self.fail(
                USER_REJECTED_REASON,
                TransactionErrorKind::TransactionRejected,
            )),
        }
    }

    fn poll_request<F, P>(
        &self,
        tx_hash: TxHash,
        fetch: F,
        is_success: P,
        success_message: &str,
    ) -> PollRequest<F, P> {
        let url = self.state.borrow().subgraph_url.clone();
        let request = PollRequest::new(url, tx_hash, fetch, is_success, success_message)
            .with_poll_config(self.poll)
            .with_cancellation(self.cancellation.clone());
        match &self.network {
            Some(network) => request.with_network(network.clone()),
            None => request,
        }
    }

    async fn await_indexing(&self, kind: TransactionKind, tx_hash: TxHash) -> IndexingOutcome {
        let subgraph = Arc::clone(&self.subgraph);
        let message = kind.success_message();

        match kind {
            TransactionKind::Deposit | TransactionKind::Withdrawal => {
                let fetch = move |url: String, hash: TxHash| {
                    let subgraph = Arc::clone(&subgraph);
                    async move { subgraph.transaction(&url, hash).await }
                };
                let request =
                    self.poll_request(tx_hash, fetch, |tx: &SgTransaction| !tx.id.is_empty(), message);
                IndexingOutcome::from_result(await_convergence(request).await, false)
            }
            TransactionKind::AddOrder => {
                let fetch = move |url: String, hash: TxHash| {
                    let subgraph = Arc::clone(&subgraph);
                    async move { subgraph.orders_added(&url, hash).await }
                };
                let request = self.poll_request(
                    tx_hash,
                    fetch,
                    |orders: &Vec<SgAddOrder>| !orders.is_empty(),
                    message,
                );
                IndexingOutcome::from_result(await_convergence(request).await, true)
            }
            TransactionKind::RemoveOrder => {
                let fetch = move |url: String, hash: TxHash| {
                    let subgraph = Arc::clone(&subgraph);
                    async move { subgraph.orders_removed(&url, hash).await }
                };
                let request = self.poll_request(
                    tx_hash,
                    fetch,
                    move |removals: &Vec<SgRemoveOrder>| removals.iter().any(|r| r.is_from(tx_hash)),
                    message,
                );
                IndexingOutcome::from_result(await_convergence(request).await, false)
            }
        }
    }
}
