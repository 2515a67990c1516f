//! Block explorer link derivation

use alloy::primitives::TxHash;

/// Kind of explorer page to link to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerKind {
    Tx,
    Address,
}

impl ExplorerKind {
    fn path_segment(self) -> &'static str {
        match self {
            ExplorerKind::Tx => "tx",
            ExplorerKind::Address => "address",
        }
    }
}

/// Known block explorer base URL for a chain
pub fn explorer_base_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://etherscan.io"),
        10 => Some("https://optimistic.etherscan.io"),
        14 => Some("https://flare-explorer.flare.network"),
        56 => Some("https://bscscan.com"),
        137 => Some("https://polygonscan.com"),
        8453 => Some("https://basescan.org"),
        42161 => Some("https://arbiscan.io"),
        59144 => Some("https://lineascan.build"),
        11155111 => Some("https://sepolia.etherscan.io"),
        _ => None,
    }
}

/// Build an explorer URL for a transaction hash
///
/// Returns `None` for chains without a known explorer.
pub fn explorer_link(hash: TxHash, chain_id: u64, kind: ExplorerKind) -> Option<String> {
    explorer_base_url(chain_id).map(|base| explorer_link_with_base(base, hash, kind))
}

/// Build an explorer URL against an explicit base URL
pub fn explorer_link_with_base(base: &str, hash: TxHash, kind: ExplorerKind) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        kind.path_segment(),
        hash
    )
}
