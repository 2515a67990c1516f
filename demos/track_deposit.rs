//! Submit a vault deposit and follow it until the subgraph reflects it
//!
//! Run with: cargo run --example track_deposit
//!
//! Requires PRIVATE_KEY, CALLDATA and VAULT_ID plus the network variables read by
//! `NetworkConfig::from_env`.

use std::sync::Arc;

use alloy::primitives::Bytes;
use orderbook_tx_sdk::{
    DepositArgs, LocalSigner, NetworkConfig, SubgraphClient, TransactionRegistry,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let private_key = std::env::var("PRIVATE_KEY").expect("PRIVATE_KEY must be set");
    let calldata: Bytes = std::env::var("CALLDATA")
        .expect("CALLDATA must be set")
        .parse()?;
    let vault_id = std::env::var("VAULT_ID").expect("VAULT_ID must be set");

    let config = NetworkConfig::from_env()?;
    let signer = LocalSigner::from_private_key(&private_key, &config.rpc_url).await?;
    let subgraph = SubgraphClient::new()?;

    println!("\n========================================");
    println!("       Orderbook Deposit Tracker");
    println!("========================================");
    println!("Wallet:   {}", signer.address());
    println!("Chain:    {}", config.chain_id);
    println!("Subgraph: {}", config.subgraph_url);

    let registry = TransactionRegistry::new(Arc::new(signer), Arc::new(subgraph), config);
    let handle = registry.create_deposit_transaction(DepositArgs { calldata, vault_id });

    let mut updates = handle.subscribe();
    loop {
        let record = updates.borrow_and_update().clone();
        println!("[{}] {}", record.state, record.message);
        if let Some(link) = &record.explorer_link {
            println!("    {}", link);
        }
        if record.state.is_terminal() {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    let record = handle.wait().await;
    if let Some(kind) = record.error {
        println!("\nFailed ({}): {}", kind, record.message);
    } else {
        println!("\nDone: {}", record.message);
    }

    Ok(())
}
