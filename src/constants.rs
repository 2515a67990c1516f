//! Constants and fixed status messages for the transaction pipeline

use std::time::Duration;

/// Default number of subgraph polling attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay between subgraph polling attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Receipt polling attempts (60 attempts * 2 seconds = 2 minutes timeout)
pub const RECEIPT_MAX_ATTEMPTS: u32 = 60;

/// Delay between receipt polling attempts
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Reason reported for every failed broadcast
pub const USER_REJECTED_REASON: &str = "User rejected transaction";

/// EIP-1193 error code for a request the user declined
pub const EIP1193_USER_REJECTED: i64 = 4001;

// ========== Status Messages ==========

pub const MSG_IDLE: &str = "Waiting to submit transaction...";
pub const MSG_PENDING_WALLET: &str = "Please confirm the transaction in your wallet...";
pub const MSG_PENDING_DEPOSIT: &str = "Depositing tokens...";
pub const MSG_PENDING_WITHDRAWAL: &str = "Withdrawing tokens...";
pub const MSG_PENDING_ADD_ORDER: &str = "Deploying order...";
pub const MSG_PENDING_REMOVE_ORDER: &str = "Removing order...";
pub const MSG_PENDING_SUBGRAPH: &str = "Waiting for transaction to be indexed...";

pub const MSG_DEPOSIT_SUCCESS: &str = "Deposit successful.";
pub const MSG_WITHDRAWAL_SUCCESS: &str = "Withdrawal successful.";
pub const MSG_ADD_ORDER_SUCCESS: &str = "Order deployed successfully.";
pub const MSG_REMOVE_ORDER_SUCCESS: &str = "Order removed successfully.";

pub const MSG_CHAIN_SWITCH_FAILED: &str = "Failed to switch chain.";
pub const MSG_RECEIPT_FAILED: &str = "Failed to get transaction receipt.";
pub const MSG_TX_REVERTED: &str = "Transaction reverted.";
pub const MSG_INDEXING_TIMEOUT: &str = "Subgraph indexing timed out.";
pub const MSG_INDEXING_UNKNOWN: &str = "Unknown error during indexing.";
pub const MSG_REMOVE_ORDER_INDEXING_FAILED: &str = "Failed to index order removal.";
pub const MSG_INDEXING_CANCELLED: &str = "Indexing cancelled.";

// ========== Notification Colors ==========

pub const COLOR_SUCCESS: &str = "green";
pub const COLOR_ERROR: &str = "red";
