//! TransactionRegistry - main entry point for the SDK
//!
//! The registry creates one [`TransactionStateMachine`] per submitted action, spawns it
//! on the tokio runtime and keeps a handle to its state. It is the single place where
//! query invalidation is triggered: when a machine reaches `Success`, the cached reads
//! keyed by its query key are invalidated.

use crate::config::{NetworkConfig, PollConfig};
use crate::machine::{lock, Submission, TransactionStateMachine};
use crate::notify::{
    LogInvalidator, LogNotifier, Notification, NotificationSink, QueryInvalidator,
};
use crate::signer::TransactionSigner;
use crate::subgraph::SubgraphSource;
use crate::types::{TransactionKind, TransactionRecord};
use alloy::primitives::{Bytes, TxHash};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Identifier of a tracked transaction, unique within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters for a vault deposit
#[derive(Debug, Clone)]
pub struct DepositArgs {
    /// Encoded deposit calldata for the orderbook
    pub calldata: Bytes,
    /// Vault whose cached reads are invalidated on success
    pub vault_id: String,
}

/// Parameters for a vault withdrawal
#[derive(Debug, Clone)]
pub struct WithdrawalArgs {
    /// Encoded withdrawal calldata for the orderbook
    pub calldata: Bytes,
    pub vault_id: String,
}

/// Parameters for deploying an order
#[derive(Debug, Clone)]
pub struct AddOrderArgs {
    /// Encoded add-order calldata for the orderbook
    pub calldata: Bytes,
    /// Query key invalidated once the order is indexed (e.g. the orders list)
    pub query_key: String,
}

/// Parameters for tracking an order removal already confirmed in the wallet
#[derive(Debug, Clone)]
pub struct RemoveOrderArgs {
    pub tx_hash: TxHash,
    pub order_hash: String,
}

/// Handle to a tracked transaction
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    id: TransactionId,
    state: watch::Receiver<TransactionRecord>,
    cancellation: CancellationToken,
}

impl TransactionHandle {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Current snapshot
    pub fn snapshot(&self) -> TransactionRecord {
        self.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<TransactionRecord> {
        self.state.clone()
    }

    /// Stop subgraph polling; the transaction ends in `Error`
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Wait until the transaction reaches a terminal state
    pub async fn wait(&self) -> TransactionRecord {
        let mut state = self.state.clone();
        let waited = state
            .wait_for(|record| record.state.is_terminal())
            .await
            .map(|record| record.clone());
        match waited {
            Ok(record) => record,
            // Machine dropped before finishing; report the last state it published
            Err(_) => state.borrow().clone(),
        }
    }
}

/// Keyed collection of tracked transactions
pub struct TransactionRegistry<S: TransactionSigner, I: SubgraphSource> {
    signer: Arc<S>,
    subgraph: Arc<I>,
    config: NetworkConfig,
    poll: PollConfig,
    network: Option<String>,
    notifier: Arc<dyn NotificationSink>,
    invalidator: Arc<dyn QueryInvalidator>,
    next_id: AtomicU64,
    transactions: Mutex<BTreeMap<TransactionId, TransactionHandle>>,
}

impl<S, I> TransactionRegistry<S, I>
where
    S: TransactionSigner + 'static,
    I: SubgraphSource + 'static,
{
    /// Create a new registry
    pub fn new(signer: Arc<S>, subgraph: Arc<I>, config: NetworkConfig) -> Self {
        Self {
            signer,
            subgraph,
            config,
            poll: PollConfig::default(),
            network: None,
            notifier: Arc::new(LogNotifier),
            invalidator: Arc::new(LogInvalidator),
            next_id: AtomicU64::new(1),
            transactions: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Network tag carried on indexing results
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_invalidator(mut self, invalidator: Arc<dyn QueryInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// Get the network configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    // ========== Transaction Entry Points ==========

    /// Track a vault deposit, submitting it through the wallet
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_deposit_transaction(&self, args: DepositArgs) -> TransactionHandle {
        let submission = Submission::Wallet {
            to: self.config.orderbook,
            calldata: args.calldata,
        };
        self.create(TransactionKind::Deposit, args.vault_id, submission)
    }

    /// Track a vault withdrawal, submitting it through the wallet
    pub fn create_withdrawal_transaction(&self, args: WithdrawalArgs) -> TransactionHandle {
        let submission = Submission::Wallet {
            to: self.config.orderbook,
            calldata: args.calldata,
        };
        self.create(TransactionKind::Withdrawal, args.vault_id, submission)
    }

    /// Track an order deployment, submitting it through the wallet
    pub fn create_add_order_transaction(&self, args: AddOrderArgs) -> TransactionHandle {
        let submission = Submission::Wallet {
            to: self.config.orderbook,
            calldata: args.calldata,
        };
        self.create(TransactionKind::AddOrder, args.query_key, submission)
    }

    /// Track an order removal whose hash is already known
    pub fn create_remove_order_transaction(&self, args: RemoveOrderArgs) -> TransactionHandle {
        self.create(
            TransactionKind::RemoveOrder,
            args.order_hash,
            Submission::Broadcast(args.tx_hash),
        )
    }

    fn create(
        &self,
        kind: TransactionKind,
        query_key: String,
        submission: Submission,
    ) -> TransactionHandle {
        let id = TransactionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = TransactionRecord::new(
            kind,
            self.config.chain_id,
            self.config.subgraph_url.clone(),
            query_key.clone(),
        );
        let cancellation = CancellationToken::new();

        let invalidator = Arc::clone(&self.invalidator);
        let success_notifier = Arc::clone(&self.notifier);
        let error_notifier = Arc::clone(&self.notifier);

        let mut machine = TransactionStateMachine::new(
            Arc::clone(&self.signer),
            Arc::clone(&self.subgraph),
            record,
        )
        .with_poll_config(self.poll)
        .with_cancellation(cancellation.clone())
        .on_success(move |record| {
            invalidator.invalidate(&[record.query_key.clone()]);
            if let Some(notification) = Notification::from_record(record) {
                success_notifier.notify(notification);
            }
        })
        .on_error(move |record| {
            if let Some(notification) = Notification::from_record(record) {
                error_notifier.notify(notification);
            }
        });
        if let Some(explorer_url) = &self.config.explorer_url {
            machine = machine.with_explorer_url(explorer_url.clone());
        }
        if let Some(network) = &self.network {
            machine = machine.with_network(network.clone());
        }

        let handle = TransactionHandle {
            id,
            state: machine.subscribe(),
            cancellation,
        };

        tokio::spawn(async move {
            machine.run(submission).await;
        });

        tracing::info!("Tracking {:?} transaction {} for {}", kind, id, query_key);
        lock(&self.transactions).insert(id, handle.clone());
        handle
    }

    // ========== Lookup & Disposal ==========

    pub fn get(&self, id: TransactionId) -> Option<TransactionHandle> {
        lock(&self.transactions).get(&id).cloned()
    }

    pub fn snapshot(&self, id: TransactionId) -> Option<TransactionRecord> {
        self.get(id).map(|handle| handle.snapshot())
    }

    pub fn subscribe(&self, id: TransactionId) -> Option<watch::Receiver<TransactionRecord>> {
        self.get(id).map(|handle| handle.subscribe())
    }

    /// Snapshots of every tracked transaction, in creation order
    pub fn snapshots(&self) -> Vec<TransactionRecord> {
        lock(&self.transactions)
            .values()
            .map(TransactionHandle::snapshot)
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.transactions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.transactions).is_empty()
    }

    /// Stop tracking a transaction, cancelling its subgraph polling
    pub fn remove(&self, id: TransactionId) -> bool {
        match lock(&self.transactions).remove(&id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop every transaction that reached a terminal state, returning how many
    pub fn prune_finished(&self) -> usize {
        let mut transactions = lock(&self.transactions);
        let before = transactions.len();
        transactions.retain(|_, handle| !handle.snapshot().state.is_terminal());
        before - transactions.len()
    }

    /// Wait for every tracked transaction to reach a terminal state
    pub async fn settle_all(&self) -> Vec<TransactionRecord> {
        let handles: Vec<TransactionHandle> = lock(&self.transactions).values().cloned().collect();
        futures::future::join_all(handles.iter().map(|handle| handle.wait())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransactionErrorKind;
    use crate::notify::NotificationKind;
    use crate::test_utils::{
        removal, MockSigner, MockSubgraph, RecordingInvalidator, RecordingNotifier,
        ReceiptBehavior,
    };
    use crate::types::TransactionState;
    use alloy::primitives::Address;
    use std::time::Duration;

    struct Fixture {
        registry: TransactionRegistry<MockSigner, MockSubgraph>,
        signer: Arc<MockSigner>,
        subgraph: Arc<MockSubgraph>,
        notifier: Arc<RecordingNotifier>,
        invalidator: Arc<RecordingInvalidator>,
    }

    fn fixture(signer: MockSigner, subgraph: MockSubgraph) -> Fixture {
        let signer = Arc::new(signer);
        let subgraph = Arc::new(subgraph);
        let notifier = Arc::new(RecordingNotifier::default());
        let invalidator = Arc::new(RecordingInvalidator::default());
        let config = NetworkConfig::new(
            42161,
            "http://localhost:8545",
            "https://subgraph.example/orderbook",
            Address::repeat_byte(0x0b),
        );

        let registry = TransactionRegistry::new(Arc::clone(&signer), Arc::clone(&subgraph), config)
            .with_poll_config(
                PollConfig::default()
                    .with_max_attempts(4)
                    .with_interval(Duration::from_millis(250)),
            )
            .with_notifier(notifier.clone())
            .with_invalidator(invalidator.clone());

        Fixture {
            registry,
            signer,
            subgraph,
            notifier,
            invalidator,
        }
    }

    fn deposit(vault_id: &str) -> DepositArgs {
        DepositArgs {
            calldata: Bytes::from_static(&[0xaa]),
            vault_id: vault_id.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_invalidates_query_key() {
        let f = fixture(MockSigner::new(), MockSubgraph::new().ready_after(2));

        let handle = f.registry.create_deposit_transaction(deposit("vault-1"));
        let record = handle.wait().await;

        assert_eq!(record.state, TransactionState::Success);
        assert_eq!(f.invalidator.keys(), vec![vec!["vault-1".to_string()]]);

        let notifications = f.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Success);
        assert_eq!(notifications[0].message, "Deposit successful.");
        assert_eq!(notifications[0].color, "green");
        assert_eq!(notifications[0].links.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_notifies_without_invalidation() {
        let f = fixture(
            MockSigner::new().with_receipt(ReceiptBehavior::Fails),
            MockSubgraph::new().ready_after(1),
        );

        let handle = f.registry.create_withdrawal_transaction(WithdrawalArgs {
            calldata: Bytes::from_static(&[0xbb]),
            vault_id: "vault-2".to_string(),
        });
        let record = handle.wait().await;

        assert_eq!(record.error, Some(TransactionErrorKind::ReceiptWaitFailed));
        assert!(f.invalidator.keys().is_empty());

        let notifications = f.notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Error);
        assert_eq!(notifications[0].message, "Failed to get transaction receipt.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_order_is_keyed_by_order_hash() {
        let f = fixture(MockSigner::new(), MockSubgraph::new().ready_after(1));
        let hash = f.signer.tx_hash();
        f.subgraph.set_removed(vec![removal(hash, "0xorder")]);

        let handle = f.registry.create_remove_order_transaction(RemoveOrderArgs {
            tx_hash: hash,
            order_hash: "0xorder".to_string(),
        });
        let record = handle.wait().await;

        assert_eq!(record.kind, TransactionKind::RemoveOrder);
        assert_eq!(record.query_key, "0xorder");
        assert_eq!(f.invalidator.keys(), vec![vec!["0xorder".to_string()]]);
        assert_eq!(f.signer.calls(), vec!["wait_for_receipt"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracks_every_created_transaction() {
        let f = fixture(MockSigner::new(), MockSubgraph::new().ready_after(1));

        let first = f.registry.create_deposit_transaction(deposit("vault-1"));
        let second = f.registry.create_add_order_transaction(AddOrderArgs {
            calldata: Bytes::from_static(&[0xcc]),
            query_key: "orders".to_string(),
        });

        assert_ne!(first.id(), second.id());
        assert_eq!(f.registry.len(), 2);
        assert_eq!(
            f.registry.snapshot(first.id()).map(|r| r.kind),
            Some(TransactionKind::Deposit)
        );

        let records = f.registry.settle_all().await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.state.is_terminal()));
        // Add order never surfaces an order hash with an empty subgraph response
        assert_eq!(records[1].error, Some(TransactionErrorKind::IndexingTimeout));

        assert_eq!(f.registry.prune_finished(), 2);
        assert!(f.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_cancels_polling() {
        let f = fixture(MockSigner::new(), MockSubgraph::new());

        let handle = f.registry.create_deposit_transaction(deposit("vault-1"));
        let mut state = handle.subscribe();
        state
            .wait_for(|record| record.state == TransactionState::PendingSubgraph)
            .await
            .unwrap();

        assert!(f.registry.remove(handle.id()));
        assert!(!f.registry.remove(handle.id()));

        let record = handle.wait().await;
        assert_eq!(record.error, Some(TransactionErrorKind::IndexingCancelled));
        assert!(f.invalidator.keys().is_empty());
        assert!(f.subgraph.calls() < 4);
    }

    #[tokio::test]
    async fn test_wait_returns_last_state_when_machine_is_dropped() {
        let record = TransactionRecord::new(TransactionKind::Deposit, 1, "http://sg", "vault-1");
        let (sender, receiver) = watch::channel(record);
        let handle = TransactionHandle {
            id: TransactionId(7),
            state: receiver,
            cancellation: CancellationToken::new(),
        };
        drop(sender);

        let record = handle.wait().await;
        assert_eq!(record.state, TransactionState::Idle);
        assert_eq!(record.query_key, "vault-1");
    }
}
