//! In-memory stand-ins for the chain and IPFS used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::{keccak256, Address, Bytes, TxHash, B256};
use async_trait::async_trait;
use serde_json::Value;

use crate::blockchain::{BlockchainError, BlockchainResult, IndexedMail, Mailer};
use crate::ipfs::{ContentStore, IpfsError, IpfsResult};

#[derive(Default)]
struct MailerState {
    mails: Vec<IndexedMail>,
    registered: Vec<String>,
    owners: HashMap<String, Address>,
    deployed: HashSet<Address>,
    failing_mail_ids: HashSet<u64>,
    inbox_down: bool,
    index_down: bool,
    claim_failures_left: u32,
    claim_attempts: u32,
    claim_yields: bool,
    tx_counter: u64,
}

/// A mailer contract living in a mutex.
#[derive(Default)]
pub struct FakeMailer {
    state: Mutex<MailerState>,
}

impl FakeMailer {
    pub fn wallet_for(email: &str) -> Address {
        Address::from_slice(&keccak256(format!("wallet:{email}"))[12..])
    }

    fn next_tx(state: &mut MailerState) -> TxHash {
        state.tx_counter += 1;
        keccak256(format!("tx-{}", state.tx_counter))
    }

    pub fn registered_emails(&self) -> Vec<String> {
        self.state.lock().unwrap().registered.clone()
    }

    pub fn fail_next_claims(&self, count: u32) {
        self.state.lock().unwrap().claim_failures_left = count;
    }

    /// Make `claim_wallet` suspend once before touching state.
    pub fn set_claim_yields(&self, yields: bool) {
        self.state.lock().unwrap().claim_yields = yields;
    }

    pub fn claim_attempts(&self) -> u32 {
        self.state.lock().unwrap().claim_attempts
    }

    pub fn fail_mail(&self, id: u64) {
        self.state.lock().unwrap().failing_mail_ids.insert(id);
    }

    pub fn set_inbox_down(&self, down: bool) {
        self.state.lock().unwrap().inbox_down = down;
    }

    pub fn set_index_down(&self, down: bool) {
        self.state.lock().unwrap().index_down = down;
    }

    pub fn indexed(&self) -> Vec<IndexedMail> {
        self.state.lock().unwrap().mails.clone()
    }

    /// Index a record directly, bypassing the service.
    pub fn push_mail(&self, recipient: &str, cid_hash: B256, has_crypto: bool) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.mails.len() as u64;
        state.mails.push(IndexedMail {
            id,
            sender: Address::repeat_byte(0x22),
            recipient_email: recipient.to_string(),
            cid_hash,
            timestamp: 1_700_000_000 + id,
            is_external: false,
            has_crypto,
        });
        id
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn index_mail(&self, recipient: &str, cid_hash: B256, _: bool, has_crypto: bool) -> BlockchainResult<TxHash> {
        if self.state.lock().unwrap().index_down {
            return Err(BlockchainError::Rpc("indexMail rejected".to_string()));
        }
        self.push_mail(recipient, cid_hash, has_crypto);
        Ok(Self::next_tx(&mut self.state.lock().unwrap()))
    }

    async fn inbox_ids(&self, email: &str) -> BlockchainResult<Vec<u64>> {
        let state = self.state.lock().unwrap();
        if state.inbox_down {
            return Err(BlockchainError::Rpc("connection refused".to_string()));
        }
        Ok(state
            .mails
            .iter()
            .filter(|m| m.recipient_email == email)
            .map(|m| m.id)
            .collect())
    }

    async fn mail(&self, id: u64) -> BlockchainResult<IndexedMail> {
        let state = self.state.lock().unwrap();
        if state.failing_mail_ids.contains(&id) {
            return Err(BlockchainError::Rpc(format!("getMail({id}) reverted")));
        }
        state
            .mails
            .get(id as usize)
            .cloned()
            .ok_or_else(|| BlockchainError::Reverted("no such mail".to_string()))
    }

    async fn register_email(&self, email: &str) -> BlockchainResult<TxHash> {
        let mut state = self.state.lock().unwrap();
        state.registered.push(email.to_string());
        Ok(Self::next_tx(&mut state))
    }

    async fn claim_wallet(&self, email: &str, owner: Address, _: Bytes) -> BlockchainResult<TxHash> {
        let yields = self.state.lock().unwrap().claim_yields;
        if yields {
            tokio::task::yield_now().await;
        }
        let mut state = self.state.lock().unwrap();
        state.claim_attempts += 1;
        if state.claim_failures_left > 0 {
            state.claim_failures_left -= 1;
            return Err(BlockchainError::Rpc("nonce too low".to_string()));
        }
        let wallet = Self::wallet_for(email);
        if !state.deployed.insert(wallet) {
            return Err(BlockchainError::Reverted("wallet already claimed".to_string()));
        }
        state.owners.insert(email.to_string(), owner);
        Ok(Self::next_tx(&mut state))
    }

    async fn compute_wallet_address(&self, email: &str) -> BlockchainResult<Address> {
        Ok(Self::wallet_for(email))
    }

    async fn compute_wallet_hash(&self, email: &str) -> BlockchainResult<B256> {
        Ok(keccak256(email))
    }

    async fn is_wallet_deployed(&self, wallet: Address) -> BlockchainResult<bool> {
        Ok(self.state.lock().unwrap().deployed.contains(&wallet))
    }

    async fn email_owner(&self, email: &str) -> BlockchainResult<Address> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .owners
            .get(email)
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn wallet_address(&self, email_hash: B256) -> BlockchainResult<Address> {
        let state = self.state.lock().unwrap();
        Ok(state
            .owners
            .keys()
            .find(|email| keccak256(email.as_str()) == email_hash)
            .map(|email| Self::wallet_for(email))
            .unwrap_or(Address::ZERO))
    }
}

/// IPFS as a hash map.
#[derive(Default)]
pub struct FakeContentStore {
    docs: Mutex<HashMap<String, Value>>,
    uploads_down: Mutex<bool>,
    pinned: AtomicUsize,
}

impl FakeContentStore {
    pub fn set_uploads_down(&self, down: bool) {
        *self.uploads_down.lock().unwrap() = down;
    }

    pub fn forget(&self, cid: &str) {
        self.docs.lock().unwrap().remove(cid);
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentStore for FakeContentStore {
    async fn put_json(&self, _name: &str, value: &Value) -> IpfsResult<String> {
        if *self.uploads_down.lock().unwrap() {
            return Err(IpfsError::Upstream {
                status: 503,
                body: "pinning unavailable".to_string(),
            });
        }
        let cid = format!("bafyfake{}", self.pinned.fetch_add(1, Ordering::SeqCst));
        self.docs.lock().unwrap().insert(cid.clone(), value.clone());
        Ok(cid)
    }

    async fn get_json(&self, cid: &str) -> IpfsResult<Option<Value>> {
        Ok(self.docs.lock().unwrap().get(cid).cloned())
    }
}
