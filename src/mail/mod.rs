//! Mail sending and inbox reconciliation.
//!
//! # Data Flow
//! ```text
//! send:  SendEmailData → IPFS (JSON) → CID → keccak256 → indexMail per recipient
//! inbox: getInbox(email) → getMail(id) → CidRegistry → IPFS → MailMessage + flags
//! ```
//! The chain is the source of truth for *which* messages exist; IPFS holds
//! what they say. Either side may be missing, so reconciliation degrades
//! per message rather than failing the listing.

pub mod service;
pub mod thread;
pub mod types;

use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::ipfs::IpfsError;

pub use service::MailService;
pub use types::*;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid sender address: {0}")]
    InvalidSender(String),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Message {0} not found")]
    NotFound(u64),

    #[error("Failed to upload email to IPFS: {0}")]
    Upload(#[from] IpfsError),

    #[error(transparent)]
    Chain(#[from] BlockchainError),
}
