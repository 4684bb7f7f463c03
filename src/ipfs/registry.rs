//! CID-to-hash mapping.
//!
//! The contract stores a `bytes32` per message, but a CID is a longer
//! string. The service stores `keccak256(cid)` on-chain and keeps the
//! reverse mapping here.

use alloy::primitives::{keccak256, B256};

use crate::storage::{JsonStore, StoreError};

/// Hash a CID into the `bytes32` stored on-chain.
pub fn cid_hash(cid: &str) -> B256 {
    keccak256(cid.as_bytes())
}

/// Persistent hash → CID lookup.
#[derive(Clone)]
pub struct CidRegistry {
    entries: JsonStore<B256, String>,
}

impl CidRegistry {
    pub fn new(entries: JsonStore<B256, String>) -> Self {
        Self { entries }
    }

    /// Open the registry, saving on every registration.
    pub fn open(data_dir: Option<&str>) -> Result<Self, StoreError> {
        Ok(Self::new(JsonStore::open("cid_registry", data_dir)?.write_through()))
    }

    /// Remember a CID and return the hash to put on-chain.
    pub fn register(&self, cid: &str) -> B256 {
        let hash = cid_hash(cid);
        self.entries.insert(hash, cid.to_string());
        hash
    }

    /// Find the CID for an on-chain hash.
    ///
    /// The zero hash is what early clients indexed as a placeholder and
    /// never resolves.
    pub fn resolve(&self, hash: &B256) -> Option<String> {
        if hash.is_zero() {
            return None;
        }
        self.entries.get(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.entries.save()
    }
}
