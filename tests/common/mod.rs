//! Shared harness for the integration tests: in-memory chain and IPFS,
//! raw-TCP mock upstreams, and a server bound to an ephemeral port.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, TxHash, B256};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dexmail::blockchain::{BlockchainError, BlockchainResult, IndexedMail, Mailer};
use dexmail::config::DexmailConfig;
use dexmail::ipfs::{ContentStore, IpfsError, IpfsResult};
use dexmail::lifecycle::startup::{assemble, Backends};
use dexmail::relay::SendGridRelay;
use dexmail::{AppState, HttpServer, Shutdown};

/// The mailer contract, minus the chain.
#[derive(Default)]
pub struct MemoryMailer {
    mails: Mutex<Vec<IndexedMail>>,
    owners: Mutex<HashMap<String, Address>>,
    deployed: Mutex<HashSet<Address>>,
    pub down: Mutex<bool>,
}

impl MemoryMailer {
    pub fn wallet_for(email: &str) -> Address {
        Address::from_slice(&keccak256(format!("wallet:{email}"))[12..])
    }

    fn check(&self) -> BlockchainResult<()> {
        if *self.down.lock().unwrap() {
            return Err(BlockchainError::Rpc("connection refused".to_string()));
        }
        Ok(())
    }

    pub fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }

    pub fn mail_count(&self) -> usize {
        self.mails.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn index_mail(&self, recipient: &str, cid_hash: B256, is_external: bool, has_crypto: bool) -> BlockchainResult<TxHash> {
        self.check()?;
        let mut mails = self.mails.lock().unwrap();
        let id = mails.len() as u64;
        mails.push(IndexedMail {
            id,
            sender: Address::repeat_byte(0x11),
            recipient_email: recipient.to_string(),
            cid_hash,
            timestamp: 1_700_000_000 + id,
            is_external,
            has_crypto,
        });
        Ok(keccak256(format!("tx-{id}")))
    }

    async fn inbox_ids(&self, email: &str) -> BlockchainResult<Vec<u64>> {
        self.check()?;
        Ok(self
            .mails
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.recipient_email == email)
            .map(|m| m.id)
            .collect())
    }

    async fn mail(&self, id: u64) -> BlockchainResult<IndexedMail> {
        self.check()?;
        self.mails
            .lock()
            .unwrap()
            .get(id as usize)
            .cloned()
            .ok_or_else(|| BlockchainError::Reverted("no such mail".to_string()))
    }

    async fn register_email(&self, email: &str) -> BlockchainResult<TxHash> {
        self.check()?;
        Ok(keccak256(format!("register-{email}")))
    }

    async fn claim_wallet(&self, email: &str, owner: Address, _: Bytes) -> BlockchainResult<TxHash> {
        self.check()?;
        let wallet = Self::wallet_for(email);
        if !self.deployed.lock().unwrap().insert(wallet) {
            return Err(BlockchainError::Reverted("wallet already claimed".to_string()));
        }
        self.owners.lock().unwrap().insert(email.to_string(), owner);
        Ok(keccak256(format!("claim-{email}")))
    }

    async fn compute_wallet_address(&self, email: &str) -> BlockchainResult<Address> {
        self.check()?;
        Ok(Self::wallet_for(email))
    }

    async fn compute_wallet_hash(&self, email: &str) -> BlockchainResult<B256> {
        Ok(keccak256(email))
    }

    async fn is_wallet_deployed(&self, wallet: Address) -> BlockchainResult<bool> {
        self.check()?;
        Ok(self.deployed.lock().unwrap().contains(&wallet))
    }

    async fn email_owner(&self, email: &str) -> BlockchainResult<Address> {
        self.check()?;
        Ok(self.owners.lock().unwrap().get(email).copied().unwrap_or(Address::ZERO))
    }

    async fn wallet_address(&self, email_hash: B256) -> BlockchainResult<Address> {
        self.check()?;
        Ok(self
            .owners
            .lock()
            .unwrap()
            .keys()
            .find(|email| keccak256(email.as_str()) == email_hash)
            .map(|email| Self::wallet_for(email))
            .unwrap_or(Address::ZERO))
    }
}

/// Pinning service backed by a hash map.
#[derive(Default)]
pub struct MemoryContent {
    docs: Mutex<HashMap<String, Value>>,
    counter: AtomicUsize,
    pub uploads_down: Mutex<bool>,
}

impl MemoryContent {
    pub fn forget(&self, cid: &str) {
        self.docs.lock().unwrap().remove(cid);
    }

    pub fn set_uploads_down(&self, down: bool) {
        *self.uploads_down.lock().unwrap() = down;
    }
}

#[async_trait]
impl ContentStore for MemoryContent {
    async fn put_json(&self, _name: &str, value: &Value) -> IpfsResult<String> {
        if *self.uploads_down.lock().unwrap() {
            return Err(IpfsError::Upstream {
                status: 503,
                body: "pinning unavailable".to_string(),
            });
        }
        let cid = format!("bafytest{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.docs.lock().unwrap().insert(cid.clone(), value.clone());
        Ok(cid)
    }

    async fn get_json(&self, cid: &str) -> IpfsResult<Option<Value>> {
        Ok(self.docs.lock().unwrap().get(cid).cloned())
    }
}

/// Requests received by a mock upstream, raw.
pub type Captured = Arc<Mutex<Vec<String>>>;

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        202 => "202 Accepted",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Read one HTTP/1.1 request: headers, then `Content-Length` bytes of body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a mock upstream on an ephemeral port that answers every request
/// with `status` and a JSON `body`.
pub async fn start_mock_backend(status: u16, body: &str) -> (SocketAddr, Captured) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let body = body.to_string();

    let seen = captured.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = seen.clone();
            let body = body.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, captured)
}

/// A running server and the fakes behind it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub url: String,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    pub content: Arc<MemoryContent>,
    shutdown: Arc<Shutdown>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(config: DexmailConfig) -> Self {
        Self::start_with_relay_key(config, None).await
    }

    pub async fn start_with_relay_key(config: DexmailConfig, sendgrid_key: Option<&str>) -> Self {
        let mailer = Arc::new(MemoryMailer::default());
        let content = Arc::new(MemoryContent::default());
        let relay = SendGridRelay::new(
            &config.sendgrid,
            sendgrid_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap();

        let state = assemble(
            config,
            Backends {
                mailer: mailer.clone(),
                content: content.clone(),
                relay: Arc::new(relay),
                chain: None,
            },
        )
        .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Shutdown::new());
        let server = HttpServer::new(state.clone());
        let rx = shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });

        Self {
            addr,
            url: format!("http://{addr}"),
            state,
            mailer,
            content,
            shutdown,
            handle,
        }
    }

    /// Stop serving and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Config suitable for tests: no rate limiting, generous timeouts.
pub fn test_config() -> DexmailConfig {
    let mut config = DexmailConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.rate_limit.enabled = false;
    config.claim.base_url = "https://dexmail.test".to_string();
    config
}
