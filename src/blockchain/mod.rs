//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (DEXMAIL_RELAYER_PRIVATE_KEY)
//!     → wallet.rs (relayer key, EIP-191 recovery)
//!     → client.rs (RPC providers with timeouts + failover)
//!     → contract.rs (mailer contract reads/writes behind `Mailer`)
//!     → transaction.rs (confirmation monitoring)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable

pub mod client;
pub mod contract;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use contract::{Mailer, OnChainMailer, SharedMailer, UnavailableMailer};
pub use types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId, IndexedMail};
pub use wallet::{recover_signer, Wallet};
