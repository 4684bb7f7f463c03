//! Claim records for crypto assets sent to an email address.
//!
//! # Lifecycle
//! ```text
//! create_claim ──▶ pending ──verify code──▶ verified ──deploy──▶ claimed
//!                     │                        │
//!                     └────── ttl passes ──────┴──▶ expired
//! ```
//! Expiry is evaluated lazily whenever a record is read.

pub mod service;
pub mod types;

use thiserror::Error;

use crate::wallets::WalletError;

pub use service::{claim_url, format_assets_for_display, is_valid_claim_token_format, ClaimService};
pub use types::*;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Invalid claim token format")]
    InvalidToken,

    #[error("Claim not found")]
    NotFound,

    #[error("Claim has expired")]
    Expired,

    #[error("Claim has already been completed")]
    AlreadyClaimed,

    #[error("Claim code has not been verified")]
    NotVerified,

    #[error("Invalid claim code")]
    InvalidCode,

    /// The code was guessed wrong too many times; the claim is locked.
    #[error("Too many invalid claim code attempts")]
    TooManyAttempts,

    #[error("Claim is already being processed")]
    InProgress,

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl ClaimError {
    pub fn is_transient(&self) -> bool {
        match self {
            ClaimError::Wallet(e) => e.is_transient(),
            _ => false,
        }
    }
}
