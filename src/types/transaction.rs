//! Transaction lifecycle types shared by the state machine and registry

use crate::constants::*;
use crate::error::TransactionErrorKind;
use alloy::primitives::TxHash;
use serde::Serialize;
use std::fmt;

/// Kind of orderbook action being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    AddOrder,
    RemoveOrder,
}

impl TransactionKind {
    /// State entered while waiting for the receipt
    pub fn pending_state(self) -> TransactionState {
        match self {
            TransactionKind::Deposit => TransactionState::PendingDeposit,
            TransactionKind::Withdrawal => TransactionState::PendingWithdrawal,
            TransactionKind::AddOrder => TransactionState::PendingAddOrder,
            TransactionKind::RemoveOrder => TransactionState::PendingRemoveOrder,
        }
    }

    pub fn pending_message(self) -> &'static str {
        match self {
            TransactionKind::Deposit => MSG_PENDING_DEPOSIT,
            TransactionKind::Withdrawal => MSG_PENDING_WITHDRAWAL,
            TransactionKind::AddOrder => MSG_PENDING_ADD_ORDER,
            TransactionKind::RemoveOrder => MSG_PENDING_REMOVE_ORDER,
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            TransactionKind::Deposit => MSG_DEPOSIT_SUCCESS,
            TransactionKind::Withdrawal => MSG_WITHDRAWAL_SUCCESS,
            TransactionKind::AddOrder => MSG_ADD_ORDER_SUCCESS,
            TransactionKind::RemoveOrder => MSG_REMOVE_ORDER_SUCCESS,
        }
    }

    /// Message used when the subgraph never reflects the transaction
    pub fn timeout_message(self) -> &'static str {
        match self {
            TransactionKind::RemoveOrder => MSG_REMOVE_ORDER_INDEXING_FAILED,
            _ => MSG_INDEXING_TIMEOUT,
        }
    }
}

/// Lifecycle state of a tracked transaction
///
/// The path is `Idle -> [PendingWallet] -> Pending<Action> -> PendingSubgraph -> Success | Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Idle,
    PendingWallet,
    PendingDeposit,
    PendingWithdrawal,
    PendingAddOrder,
    PendingRemoveOrder,
    PendingSubgraph,
    Success,
    Error,
}

impl TransactionState {
    /// Position along the lifecycle path
    fn stage(self) -> u8 {
        match self {
            TransactionState::Idle => 0,
            TransactionState::PendingWallet => 1,
            TransactionState::PendingDeposit
            | TransactionState::PendingWithdrawal
            | TransactionState::PendingAddOrder
            | TransactionState::PendingRemoveOrder => 2,
            TransactionState::PendingSubgraph => 3,
            TransactionState::Success | TransactionState::Error => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Success | TransactionState::Error)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic
    pub fn can_transition_to(self, next: TransactionState) -> bool {
        if self.is_terminal() {
            return false;
        }
        self == next || next.stage() > self.stage()
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Idle => "IDLE",
            TransactionState::PendingWallet => "PENDING_WALLET",
            TransactionState::PendingDeposit => "PENDING_DEPOSIT",
            TransactionState::PendingWithdrawal => "PENDING_WITHDRAWAL",
            TransactionState::PendingAddOrder => "PENDING_ADD_ORDER",
            TransactionState::PendingRemoveOrder => "PENDING_REMOVE_ORDER",
            TransactionState::PendingSubgraph => "PENDING_SUBGRAPH",
            TransactionState::Success => "SUCCESS",
            TransactionState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Snapshot of a tracked transaction, as published to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction hash once broadcast
    pub tx_hash: Option<TxHash>,
    pub kind: TransactionKind,
    pub chain_id: u64,
    pub subgraph_url: String,
    /// Key used for cache invalidation (order id, vault id, or order hash)
    pub query_key: String,
    pub state: TransactionState,
    pub message: String,
    /// Explorer URL, set once and never recomputed
    pub explorer_link: Option<String>,
    /// Set only on terminal `Error`
    pub error: Option<TransactionErrorKind>,
    /// Order hash discovered while indexing
    pub order_hash: Option<String>,
}

impl TransactionRecord {
    pub fn new(
        kind: TransactionKind,
        chain_id: u64,
        subgraph_url: impl Into<String>,
        query_key: impl Into<String>,
    ) -> Self {
        Self {
            tx_hash: None,
            kind,
            chain_id,
            subgraph_url: subgraph_url.into(),
            query_key: query_key.into(),
            state: TransactionState::Idle,
            message: MSG_IDLE.to_string(),
            explorer_link: None,
            error: None,
            order_hash: None,
        }
    }

    /// Merge an update onto this snapshot
    ///
    /// Fields absent from the update keep their current value. The explorer link is
    /// only ever set once. Returns `false` (and leaves the record untouched) when the
    /// update would move the state backwards or out of a terminal state.
    pub fn apply(&mut self, update: RecordUpdate) -> bool {
        if !self.state.can_transition_to(update.state) {
            return false;
        }

        self.state = update.state;
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(tx_hash) = update.tx_hash {
            self.tx_hash = Some(tx_hash);
        }
        if self.explorer_link.is_none() {
            self.explorer_link = update.explorer_link;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(order_hash) = update.order_hash {
            self.order_hash = Some(order_hash);
        }
        true
    }
}

/// Partial update merged onto a [`TransactionRecord`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub state: TransactionState,
    pub message: Option<String>,
    pub tx_hash: Option<TxHash>,
    pub explorer_link: Option<String>,
    pub error: Option<TransactionErrorKind>,
    pub order_hash: Option<String>,
}

impl RecordUpdate {
    pub fn state(state: TransactionState) -> Self {
        Self {
            state,
            message: None,
            tx_hash: None,
            explorer_link: None,
            error: None,
            order_hash: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: TxHash) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }

    pub fn with_explorer_link(mut self, link: Option<String>) -> Self {
        self.explorer_link = link;
        self
    }

    pub fn with_error(mut self, error: TransactionErrorKind) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_order_hash(mut self, order_hash: Option<String>) -> Self {
        self.order_hash = order_hash;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TransactionRecord {
        TransactionRecord::new(TransactionKind::RemoveOrder, 1, "http://sg", "0xorder")
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut record = record();
        record.apply(
            RecordUpdate::state(TransactionState::PendingRemoveOrder)
                .with_message("Removing order...")
                .with_explorer_link(Some("https://etherscan.io/tx/0x1".into())),
        );
        record.apply(RecordUpdate::state(TransactionState::PendingSubgraph));

        assert_eq!(record.state, TransactionState::PendingSubgraph);
        assert_eq!(record.message, "Removing order...");
        assert_eq!(
            record.explorer_link.as_deref(),
            Some("https://etherscan.io/tx/0x1")
        );
    }

    #[test]
    fn test_explorer_link_never_recomputed() {
        let mut record = record();
        record.apply(
            RecordUpdate::state(TransactionState::PendingRemoveOrder)
                .with_explorer_link(Some("first".into())),
        );
        record.apply(
            RecordUpdate::state(TransactionState::PendingSubgraph)
                .with_explorer_link(Some("second".into())),
        );
        assert_eq!(record.explorer_link.as_deref(), Some("first"));
    }

    #[test]
    fn test_state_never_regresses() {
        let mut record = record();
        assert!(record.apply(RecordUpdate::state(TransactionState::PendingSubgraph)));
        assert!(!record.apply(RecordUpdate::state(TransactionState::PendingRemoveOrder)));
        assert!(record.apply(RecordUpdate::state(TransactionState::Success)));
        assert!(!record.apply(
            RecordUpdate::state(TransactionState::Error)
                .with_error(TransactionErrorKind::IndexingTimeout)
        ));
        assert_eq!(record.state, TransactionState::Success);
        assert_eq!(record.error, None);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(
            TransactionState::PendingRemoveOrder.to_string(),
            "PENDING_REMOVE_ORDER"
        );
        assert_eq!(TransactionState::PendingSubgraph.to_string(), "PENDING_SUBGRAPH");
    }

    #[test]
    fn test_remove_order_timeout_message() {
        assert_eq!(
            TransactionKind::RemoveOrder.timeout_message(),
            "Failed to index order removal."
        );
        assert_eq!(
            TransactionKind::Deposit.timeout_message(),
            "Subgraph indexing timed out."
        );
    }
}
