//! Subgraph client for looking up the entities a transaction produces

use crate::indexing::OrderHashSource;
use alloy::primitives::TxHash;
use eyre::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Transaction entity indexed by the subgraph
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SgTransaction {
    pub id: String,
    pub from: String,
    pub block_number: String,
    pub timestamp: String,
}

impl OrderHashSource for SgTransaction {
    fn order_hash(&self) -> Option<String> {
        None
    }
}

/// Reference to the transaction that produced an event
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SgTransactionRef {
    pub id: String,
}

/// Reference to an order touched by an event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SgOrderRef {
    pub id: String,
    pub order_hash: String,
}

/// Order added by a transaction
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SgAddOrder {
    pub transaction: SgTransactionRef,
    pub order: SgOrderRef,
}

impl OrderHashSource for SgAddOrder {
    fn order_hash(&self) -> Option<String> {
        Some(self.order.order_hash.clone()).filter(|hash| !hash.is_empty())
    }
}

/// Order removed by a transaction
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SgRemoveOrder {
    pub transaction: SgTransactionRef,
    pub order: SgOrderRef,
}

impl SgRemoveOrder {
    /// Whether this removal was emitted by `tx_hash`
    pub fn is_from(&self, tx_hash: TxHash) -> bool {
        self.transaction.id.eq_ignore_ascii_case(&tx_hash.to_string())
    }
}

impl OrderHashSource for SgRemoveOrder {
    fn order_hash(&self) -> Option<String> {
        Some(self.order.order_hash.clone()).filter(|hash| !hash.is_empty())
    }
}

/// Read side of the indexer used by the state machine
///
/// Each lookup resolves `Ok(None)` when the subgraph has nothing for the hash yet.
pub trait SubgraphSource: Send + Sync {
    /// Transaction entity by hash
    fn transaction(
        &self,
        url: &str,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<SgTransaction>>> + Send;

    /// Orders added by the transaction
    fn orders_added(
        &self,
        url: &str,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<Vec<SgAddOrder>>>> + Send;

    /// Order removals emitted by the transaction
    fn orders_removed(
        &self,
        url: &str,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<Vec<SgRemoveOrder>>>> + Send;
}

const TRANSACTION_QUERY: &str = r#"
    query transaction($id: ID!) {
        transaction(id: $id) {
            id
            from
            blockNumber
            timestamp
        }
    }
"#;

const ADD_ORDERS_QUERY: &str = r#"
    query addOrders($id: String!) {
        addOrders(where: { transaction_: { id: $id } }) {
            transaction {
                id
            }
            order {
                id
                orderHash
            }
        }
    }
"#;

const REMOVE_ORDERS_QUERY: &str = r#"
    query removeOrders($id: String!) {
        removeOrders(where: { transaction_: { id: $id } }) {
            transaction {
                id
            }
            order {
                id
                orderHash
            }
        }
    }
"#;

#[derive(Serialize)]
struct GraphQLRequest {
    query: String,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize, Debug)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    transaction: Option<SgTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddOrdersData {
    add_orders: Vec<SgAddOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveOrdersData {
    remove_orders: Vec<SgRemoveOrder>,
}

/// Unwrap a GraphQL response envelope, turning reported errors into a failure
fn into_data<T>(response: GraphQLResponse<T>) -> Result<Option<T>> {
    if let Some(errors) = response.errors {
        let error_msgs: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        eyre::bail!("Subgraph errors: {:?}", error_msgs);
    }
    Ok(response.data)
}

/// Subgraph client issuing GraphQL queries over HTTP
#[derive(Clone)]
pub struct SubgraphClient {
    client: reqwest::Client,
}

impl SubgraphClient {
    /// Create a new subgraph client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("OrderbookTxSDK/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &str,
        tx_hash: TxHash,
    ) -> Result<Option<T>> {
        let request = GraphQLRequest {
            query: query.to_string(),
            variables: serde_json::json!({
                "id": tx_hash.to_string().to_lowercase()
            }),
        };

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to query subgraph")?;

        let result: GraphQLResponse<T> = response
            .json()
            .await
            .context("Failed to parse subgraph response")?;

        into_data(result)
    }
}

impl SubgraphSource for SubgraphClient {
    async fn transaction(&self, url: &str, tx_hash: TxHash) -> Result<Option<SgTransaction>> {
        let data: Option<TransactionData> = self.query(url, TRANSACTION_QUERY, tx_hash).await?;
        Ok(data.and_then(|d| d.transaction))
    }

    async fn orders_added(&self, url: &str, tx_hash: TxHash) -> Result<Option<Vec<SgAddOrder>>> {
        let data: Option<AddOrdersData> = self.query(url, ADD_ORDERS_QUERY, tx_hash).await?;
        Ok(data.map(|d| d.add_orders))
    }

    async fn orders_removed(
        &self,
        url: &str,
        tx_hash: TxHash,
    ) -> Result<Option<Vec<SgRemoveOrder>>> {
        let data: Option<RemoveOrdersData> =
            self.query(url, REMOVE_ORDERS_QUERY, tx_hash).await?;
        Ok(data.map(|d| d.remove_orders))
    }
}
