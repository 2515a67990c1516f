//! Network and polling configuration for the transaction SDK

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use alloy::primitives::Address;
use eyre::{Context, Result};
use std::time::Duration;

/// Network configuration containing RPC, subgraph and contract endpoints
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Chain ID transactions are submitted to
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Subgraph endpoint used for indexing convergence
    pub subgraph_url: String,
    /// Orderbook contract address (target of deposit/withdraw/order calldata)
    pub orderbook: Address,
    /// Block explorer override (defaults to the chain's known explorer)
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    /// Create a configuration from explicit values
    pub fn new(
        chain_id: u64,
        rpc_url: impl Into<String>,
        subgraph_url: impl Into<String>,
        orderbook: Address,
    ) -> Self {
        Self {
            chain_id,
            rpc_url: rpc_url.into(),
            subgraph_url: subgraph_url.into(),
            orderbook,
            explorer_url: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Reads `CHAIN_ID`, `RPC_URL`, `SUBGRAPH_URL`, `ORDERBOOK_ADDRESS` and the optional
    /// `EXPLORER_URL`.
    pub fn from_env() -> Result<Self> {
        let chain_id = required_env("CHAIN_ID")?
            .parse()
            .context("CHAIN_ID must be an integer")?;
        let orderbook = required_env("ORDERBOOK_ADDRESS")?
            .parse()
            .context("ORDERBOOK_ADDRESS must be a valid address")?;

        Ok(Self {
            chain_id,
            rpc_url: required_env("RPC_URL")?,
            subgraph_url: required_env("SUBGRAPH_URL")?,
            orderbook,
            explorer_url: std::env::var("EXPLORER_URL").ok(),
        })
    }

    /// Set the RPC URL
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Set the subgraph URL
    pub fn with_subgraph_url(mut self, subgraph_url: impl Into<String>) -> Self {
        self.subgraph_url = subgraph_url.into();
        self
    }

    /// Set a block explorer base URL
    pub fn with_explorer_url(mut self, explorer_url: impl Into<String>) -> Self {
        self.explorer_url = Some(explorer_url.into());
        self
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} environment variable must be set", key))
}

/// Retry budget for subgraph convergence polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of fetch attempts
    pub max_attempts: u32,
    /// Delay after each unsuccessful attempt
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    /// Set the maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the polling interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Total time budget (`max_attempts * interval`)
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}
