//! Wallet confirmation: chain switch followed by broadcast
//!
//! Provider outcomes are folded into a small [`WalletConfirmation`] result. Nothing is
//! retried here; the caller decides whether to offer the user another attempt.

use crate::constants::{EIP1193_USER_REJECTED, USER_REJECTED_REASON};
use crate::error::{Report, WalletError};
use crate::signer::{TransactionSigner, TxRequest};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::transports::{RpcError, TransportErrorKind};
use std::sync::Arc;

/// Arguments for a single wallet confirmation
pub struct ConfirmArgs<F> {
    pub chain_id: u64,
    pub to: Address,
    pub calldata: Bytes,
    /// Invoked with the hash right after a successful broadcast
    pub on_confirm: F,
}

/// Why a broadcast failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCause {
    /// The user declined in their wallet
    UserDeclined,
    /// Provider, RPC or network failure
    Infrastructure,
}

/// Outcome of a wallet confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletState {
    Confirmed,
    /// Broadcast failed; `reason` is always the user-rejected message
    Rejected {
        reason: String,
        cause: RejectionCause,
    },
    /// Chain switch failed; broadcast was not attempted
    Error { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfirmation {
    pub state: WalletState,
    pub hash: Option<TxHash>,
}

impl WalletConfirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, WalletState::Confirmed)
    }

    /// Broadcast hash, only present when confirmed
    pub fn confirmed_hash(&self) -> Option<TxHash> {
        self.hash.filter(|_| self.is_confirmed())
    }
}

/// Drives chain switch and broadcast against a wallet provider
pub struct WalletConfirmationCoordinator<S: TransactionSigner> {
    signer: Arc<S>,
}

impl<S: TransactionSigner> WalletConfirmationCoordinator<S> {
    pub fn new(signer: Arc<S>) -> Self {
        Self { signer }
    }

    /// Switch chain, broadcast, then hand the hash to `on_confirm`
    pub async fn confirm<F>(&self, args: ConfirmArgs<F>) -> WalletConfirmation
    where
        F: FnOnce(TxHash),
    {
        let ConfirmArgs {
            chain_id,
            to,
            calldata,
            on_confirm,
        } = args;

        if let Err(err) = self.signer.switch_chain(chain_id).await {
            tracing::warn!("Failed to switch wallet to chain {}: {:#}", chain_id, err);
            return WalletConfirmation {
                state: WalletState::Error {
                    reason: err.to_string(),
                },
                hash: None,
            };
        }

        let hash = match self.signer.sign_and_send(TxRequest::new(to, calldata)).await {
            Ok(hash) => hash,
            Err(err) => {
                let cause = classify_rejection(&err);
                tracing::warn!("Transaction broadcast failed ({:?}): {:#}", cause, err);
                return WalletConfirmation {
                    state: WalletState::Rejected {
                        reason: USER_REJECTED_REASON.to_string(),
                        cause,
                    },
                    hash: None,
                };
            }
        };

        tracing::info!("Transaction broadcast: {}", hash);
        on_confirm(hash);

        WalletConfirmation {
            state: WalletState::Confirmed,
            hash: Some(hash),
        }
    }
}

/// Classify a broadcast failure by the error tags found in its chain
pub fn classify_rejection(err: &Report) -> RejectionCause {
    for cause in err.chain() {
        if let Some(WalletError::UserRejected) = cause.downcast_ref::<WalletError>() {
            return RejectionCause::UserDeclined;
        }
        if let Some(RpcError::ErrorResp(payload)) =
            cause.downcast_ref::<RpcError<TransportErrorKind>>()
        {
            if payload.code == EIP1193_USER_REJECTED {
                return RejectionCause::UserDeclined;
            }
        }
    }
    RejectionCause::Infrastructure
}
