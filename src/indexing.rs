//! Subgraph indexing convergence
//!
//! The subgraph is an eventually-consistent read model: a transaction can be mined well
//! before its effect becomes queryable. [`await_convergence`] repeatedly fetches an
//! entity until a caller-supplied predicate accepts it, or the retry budget runs out.
//!
//! Per-attempt fetch failures never abort the loop; only budget exhaustion (or
//! cancellation) ends it without a value.

use crate::config::PollConfig;
use crate::error::Result;
use alloy::primitives::TxHash;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a single fetch: `Ok(Some)` is a value, `Ok(None)` a null value
pub type FetchOutcome<T> = Result<Option<T>>;

/// Entities that may carry an order hash worth surfacing
///
/// List-shaped results surface the first element's order hash; scalar entities
/// usually return `None`.
pub trait OrderHashSource {
    fn order_hash(&self) -> Option<String>;
}

impl<T: OrderHashSource> OrderHashSource for Vec<T> {
    fn order_hash(&self) -> Option<String> {
        self.first().and_then(OrderHashSource::order_hash)
    }
}

impl OrderHashSource for serde_json::Value {
    fn order_hash(&self) -> Option<String> {
        self.as_array()?
            .first()?
            .get("order")?
            .get("orderHash")?
            .as_str()
            .map(str::to_string)
    }
}

/// Parameters for one convergence poll
pub struct PollRequest<F, P> {
    pub subgraph_url: String,
    pub tx_hash: TxHash,
    /// Reads the entity from the subgraph
    pub fetch: F,
    /// Decides whether the fetched value reflects the transaction
    pub is_success: P,
    pub max_attempts: u32,
    pub interval: Duration,
    /// Carried through to the result
    pub success_message: String,
    /// Carried through to the result
    pub network: Option<String>,
    pub cancellation: Option<CancellationToken>,
}

impl<F, P> PollRequest<F, P> {
    /// Create a request with the default retry budget
    pub fn new(
        subgraph_url: impl Into<String>,
        tx_hash: TxHash,
        fetch: F,
        is_success: P,
        success_message: impl Into<String>,
    ) -> Self {
        let defaults = PollConfig::default();
        Self {
            subgraph_url: subgraph_url.into(),
            tx_hash,
            fetch,
            is_success,
            max_attempts: defaults.max_attempts,
            interval: defaults.interval,
            success_message: success_message.into(),
            network: None,
            cancellation: None,
        }
    }

    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.max_attempts = config.max_attempts;
        self.interval = config.interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Stop polling once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Converged value plus the request's pass-through fields
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedValue<T> {
    pub data: T,
    pub tx_hash: TxHash,
    pub success_message: String,
    pub network: Option<String>,
    pub order_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IndexingError {
    #[error("subgraph indexing timed out")]
    Timeout,
    #[error("subgraph polling was cancelled")]
    Cancelled,
}

/// Outcome of [`await_convergence`]
#[derive(Debug, Clone, PartialEq)]
pub enum IndexingResult<T> {
    Value(IndexedValue<T>),
    Error(IndexingError),
}

impl<T> IndexingResult<T> {
    pub fn value(&self) -> Option<&IndexedValue<T>> {
        match self {
            IndexingResult::Value(value) => Some(value),
            IndexingResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<IndexingError> {
        match self {
            IndexingResult::Value(_) => None,
            IndexingResult::Error(err) => Some(*err),
        }
    }
}

/// Poll the subgraph until `is_success` accepts a fetched value
///
/// Returns on the first accepted value without waiting out the remaining attempts.
/// Sleeps `interval` after every unsuccessful attempt, so exhausting the budget takes
/// `max_attempts * interval`.
pub async fn await_convergence<T, F, Fut, P>(request: PollRequest<F, P>) -> IndexingResult<T>
where
    T: OrderHashSource,
    F: Fn(String, TxHash) -> Fut,
    Fut: Future<Output = FetchOutcome<T>>,
    P: Fn(&T) -> bool,
{
    let PollRequest {
        subgraph_url,
        tx_hash,
        fetch,
        is_success,
        max_attempts,
        interval,
        success_message,
        network,
        cancellation,
    } = request;

    for attempt in 1..=max_attempts {
        if cancellation.as_ref().is_some_and(|token| token.is_cancelled()) {
            tracing::debug!("Indexing poll for {} cancelled", tx_hash);
            return IndexingResult::Error(IndexingError::Cancelled);
        }

        match fetch(subgraph_url.clone(), tx_hash).await {
            Ok(Some(data)) if is_success(&data) => {
                let order_hash = data.order_hash();
                tracing::info!(
                    "Transaction {} indexed after {} attempt(s)",
                    tx_hash,
                    attempt
                );
                return IndexingResult::Value(IndexedValue {
                    data,
                    tx_hash,
                    success_message,
                    network,
                    order_hash,
                });
            }
            Ok(_) => {
                tracing::debug!(
                    "Transaction {} not indexed yet (attempt {}/{})",
                    tx_hash,
                    attempt,
                    max_attempts
                );
            }
            Err(err) => {
                tracing::warn!(
                    "Subgraph fetch for {} failed (attempt {}/{}): {:#}",
                    tx_hash,
                    attempt,
                    max_attempts,
                    err
                );
            }
        }

        match &cancellation {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Indexing poll for {} cancelled", tx_hash);
                        return IndexingResult::Error(IndexingError::Cancelled);
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            None => tokio::time::sleep(interval).await,
        }
    }

    tracing::warn!(
        "Transaction {} not indexed after {} attempts",
        tx_hash,
        max_attempts
    );
    IndexingResult::Error(IndexingError::Timeout)
}
