//! Off-chain message storage.
//!
//! # Data Flow
//! ```text
//! send:  message JSON → ContentStore::put_json → CID
//!                     → CidRegistry::register → keccak256(CID) (fits bytes32)
//! read:  bytes32 from contract → CidRegistry::resolve → CID
//!                     → ContentStore::get_json → message JSON (or None)
//! ```

pub mod pinata;
pub mod registry;

use std::sync::Arc;
use async_trait::async_trait;
use thiserror::Error;

pub use pinata::PinataStore;
pub use registry::{cid_hash, CidRegistry};

/// Errors from the IPFS pinning service or gateway.
#[derive(Debug, Error)]
pub enum IpfsError {
    #[error("IPFS pinning is not configured")]
    NotConfigured,

    #[error("IPFS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IPFS upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("IPFS response was not understood: {0}")]
    Malformed(String),
}

pub type IpfsResult<T> = Result<T, IpfsError>;

/// Content-addressed JSON storage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Pin a JSON document and return its CID.
    async fn put_json(&self, name: &str, value: &serde_json::Value) -> IpfsResult<String>;

    /// Fetch a JSON document. `Ok(None)` when the content does not exist.
    async fn get_json(&self, cid: &str) -> IpfsResult<Option<serde_json::Value>>;
}

pub type SharedContentStore = Arc<dyn ContentStore>;
