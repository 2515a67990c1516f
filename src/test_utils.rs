//! In-memory wallet, subgraph and sink doubles shared by unit tests

use crate::error::WalletError;
use crate::machine::lock;
use crate::notify::{Notification, NotificationSink, QueryInvalidator};
use crate::signer::{TransactionSigner, TxReceipt, TxRequest};
use crate::subgraph::{
    SgAddOrder, SgOrderRef, SgRemoveOrder, SgTransaction, SgTransactionRef, SubgraphSource,
};
use crate::types::TransactionRecord;
use alloy::primitives::{Address, TxHash};
use eyre::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;

/// Captures the machine's state whenever a collaborator is called
#[derive(Default)]
pub(crate) struct StateProbe {
    observer: Mutex<Option<watch::Receiver<TransactionRecord>>>,
    seen: Mutex<Vec<TransactionRecord>>,
}

impl StateProbe {
    pub(crate) fn attach(&self, receiver: watch::Receiver<TransactionRecord>) {
        *lock(&self.observer) = Some(receiver);
    }

    fn capture(&self) {
        let snapshot = lock(&self.observer)
            .as_ref()
            .map(|receiver| receiver.borrow().clone());
        if let Some(snapshot) = snapshot {
            lock(&self.seen).push(snapshot);
        }
    }

    pub(crate) fn seen(&self) -> Vec<TransactionRecord> {
        lock(&self.seen).clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum SendBehavior {
    Broadcast,
    UserRejected,
    ProviderError,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ReceiptBehavior {
    Mined,
    Reverted,
    Fails,
}

pub(crate) struct MockSigner {
    hash: TxHash,
    switch_fails: bool,
    send: SendBehavior,
    receipt: ReceiptBehavior,
    calls: Mutex<Vec<&'static str>>,
    pub(crate) probe: StateProbe,
}

impl MockSigner {
    pub(crate) fn new() -> Self {
        Self {
            hash: TxHash::repeat_byte(0x5a),
            switch_fails: false,
            send: SendBehavior::Broadcast,
            receipt: ReceiptBehavior::Mined,
            calls: Mutex::new(Vec::new()),
            probe: StateProbe::default(),
        }
    }

    pub(crate) fn failing_switch(mut self) -> Self {
        self.switch_fails = true;
        self
    }

    pub(crate) fn with_send(mut self, send: SendBehavior) -> Self {
        self.send = send;
        self
    }

    pub(crate) fn with_receipt(mut self, receipt: ReceiptBehavior) -> Self {
        self.receipt = receipt;
        self
    }

    pub(crate) fn tx_hash(&self) -> TxHash {
        self.hash
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: &'static str) {
        lock(&self.calls).push(call);
        self.probe.capture();
    }
}

impl TransactionSigner for MockSigner {
    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.record("switch_chain");
        if self.switch_fails {
            return Err(WalletError::ChainMismatch {
                expected: chain_id,
                actual: 1,
            }
            .into());
        }
        Ok(())
    }

    async fn sign_and_send(&self, _tx: TxRequest) -> Result<TxHash> {
        self.record("sign_and_send");
        match self.send {
            SendBehavior::Broadcast => Ok(self.hash),
            SendBehavior::UserRejected => Err(WalletError::UserRejected.into()),
            SendBehavior::ProviderError => Err(eyre::eyre!("connection reset by peer")),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        self.record("wait_for_receipt");
        match self.receipt {
            ReceiptBehavior::Mined => Ok(TxReceipt {
                tx_hash,
                block_number: Some(100),
                success: true,
            }),
            ReceiptBehavior::Reverted => Ok(TxReceipt {
                tx_hash,
                block_number: Some(100),
                success: false,
            }),
            ReceiptBehavior::Fails => eyre::bail!("receipt not found"),
        }
    }
}

pub(crate) fn addition(tx_hash: TxHash, order_hash: &str) -> SgAddOrder {
    SgAddOrder {
        transaction: SgTransactionRef {
            id: tx_hash.to_string(),
        },
        order: SgOrderRef {
            id: format!("order-{}", order_hash),
            order_hash: order_hash.to_string(),
        },
    }
}

pub(crate) fn removal(tx_hash: TxHash, order_hash: &str) -> SgRemoveOrder {
    SgRemoveOrder {
        transaction: SgTransactionRef {
            id: tx_hash.to_string(),
        },
        order: SgOrderRef {
            id: format!("order-{}", order_hash),
            order_hash: order_hash.to_string(),
        },
    }
}

/// Subgraph that starts reflecting the transaction from the `ready_after`-th call on
pub(crate) struct MockSubgraph {
    ready_after: Option<usize>,
    failing: bool,
    added: Mutex<Vec<SgAddOrder>>,
    removed: Mutex<Vec<SgRemoveOrder>>,
    calls: AtomicUsize,
    pub(crate) probe: StateProbe,
}

impl MockSubgraph {
    /// Never reflects the transaction
    pub(crate) fn new() -> Self {
        Self {
            ready_after: None,
            failing: false,
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            probe: StateProbe::default(),
        }
    }

    pub(crate) fn ready_after(mut self, calls: usize) -> Self {
        self.ready_after = Some(calls);
        self
    }

    /// Every call fails
    pub(crate) fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub(crate) fn set_added(&self, added: Vec<SgAddOrder>) {
        *lock(&self.added) = added;
    }

    pub(crate) fn set_removed(&self, removed: Vec<SgRemoveOrder>) {
        *lock(&self.removed) = removed;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn attempt(&self) -> Result<bool> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.capture();
        if self.failing {
            eyre::bail!("subgraph unavailable");
        }
        Ok(self.ready_after.is_some_and(|ready| n >= ready))
    }
}

impl SubgraphSource for MockSubgraph {
    async fn transaction(&self, _url: &str, tx_hash: TxHash) -> Result<Option<SgTransaction>> {
        let ready = self.attempt()?;
        Ok(ready.then(|| SgTransaction {
            id: tx_hash.to_string(),
            from: Address::repeat_byte(0x01).to_string(),
            block_number: "100".to_string(),
            timestamp: "1700000000".to_string(),
        }))
    }

    async fn orders_added(&self, _url: &str, _tx_hash: TxHash) -> Result<Option<Vec<SgAddOrder>>> {
        let ready = self.attempt()?;
        Ok(Some(if ready { lock(&self.added).clone() } else { Vec::new() }))
    }

    async fn orders_removed(
        &self,
        _url: &str,
        _tx_hash: TxHash,
    ) -> Result<Option<Vec<SgRemoveOrder>>> {
        let ready = self.attempt()?;
        Ok(Some(if ready {
            lock(&self.removed).clone()
        } else {
            Vec::new()
        }))
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(crate) fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}

#[derive(Default)]
pub(crate) struct RecordingInvalidator {
    keys: Mutex<Vec<Vec<String>>>,
}

impl RecordingInvalidator {
    pub(crate) fn keys(&self) -> Vec<Vec<String>> {
        lock(&self.keys).clone()
    }
}

impl QueryInvalidator for RecordingInvalidator {
    fn invalidate(&self, query_key: &[String]) {
        lock(&self.keys).push(query_key.to_vec());
    }
}
