//! Mailer contract records and chain errors.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::schema::BlockchainConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<ChainId> for u64 {
    fn from(chain: ChainId) -> Self {
        chain.0
    }
}

#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Every configured provider refused or failed the call.
    #[error("chain RPC failed: {0}")]
    Rpc(String),

    #[error("chain RPC timed out after {0}s")]
    Timeout(u64),

    /// The receipt did not reach the configured depth before the deadline.
    #[error("transaction still unconfirmed after waiting for {0} blocks")]
    ConfirmationTimeout(u32),

    /// The mailer contract rejected the call.
    #[error("contract reverted: {0}")]
    Reverted(String),

    #[error("relayer wallet: {0}")]
    Wallet(String),

    #[error("connected to chain {actual}, configured for {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Chain access is disabled, or a write was attempted without the
    /// relayer key.
    #[error("chain unavailable: {0}")]
    NotAvailable(String),

    #[error("unexpected contract data: {0}")]
    Decode(String),
}

impl BlockchainError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BlockchainError::Rpc(_) | BlockchainError::Timeout(_) | BlockchainError::ConfirmationTimeout(_)
        )
    }
}

pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Where a relayed transaction stands relative to the confirmation depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Pending,
    Confirming { current: u32, required: u32 },
    Confirmed { block_number: u64 },
    Failed(String),
}

/// A mail entry as indexed by the contract.
///
/// `cid_hash` is the keccak256 of the IPFS CID string; the contract only
/// has room for a `bytes32`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedMail {
    pub id: u64,
    pub sender: Address,
    pub recipient_email: String,
    pub cid_hash: B256,
    pub timestamp: u64,
    pub is_external: bool,
    pub has_crypto: bool,
}

/// Narrow a contract `uint256` into a `u64`.
pub fn u256_to_u64(value: U256, what: &str) -> BlockchainResult<u64> {
    u64::try_from(value).map_err(|_| BlockchainError::Decode(format!("{what} {value} overflows u64")))
}
