//! Startup orchestration.
//!
//! Subsystems initialize in dependency order: chain, then IPFS and the
//! mail relay, then local stores, then the services built on top of them.
//! A missing secret or an unreachable RPC node is logged and the service
//! starts degraded; only an unreadable store or a malformed contract
//! address aborts startup.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use thiserror::Error;

use crate::auth::{AuthService, SessionStore};
use crate::blockchain::{
    BlockchainClient, BlockchainConfig, BlockchainError, OnChainMailer, SharedMailer,
    UnavailableMailer, Wallet,
};
use crate::claim::ClaimService;
use crate::config::{
    secret_from_env, DexmailConfig, NFT_KEY_ENV_VAR, PINATA_JWT_ENV_VAR, SENDGRID_KEY_ENV_VAR,
};
use crate::http::server::AppState;
use crate::ipfs::{CidRegistry, IpfsError, PinataStore, SharedContentStore};
use crate::mail::MailService;
use crate::market::{NftService, PriceService};
use crate::relay::{SendGridRelay, SharedRelay};
use crate::storage::{JsonStore, StoreError};
use crate::wallets::WalletService;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open local store: {0}")]
    Store(#[from] StoreError),

    #[error("blockchain setup failed: {0}")]
    Chain(#[from] BlockchainError),

    #[error("IPFS setup failed: {0}")]
    Ipfs(#[from] IpfsError),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid mailer contract address '{0}'")]
    ContractAddress(String),
}

/// The external systems the services talk to.
pub struct Backends {
    pub mailer: SharedMailer,
    pub content: SharedContentStore,
    pub relay: SharedRelay,
    /// Present only when a real RPC connection exists.
    pub chain: Option<BlockchainClient>,
}

/// Connect to everything described by `config` and build the app state.
pub async fn bootstrap(config: DexmailConfig) -> Result<AppState, StartupError> {
    let upstream = Duration::from_secs(config.timeouts.upstream_secs);

    let (mailer, chain) = connect_chain(&config.blockchain).await?;
    let content: SharedContentStore = Arc::new(PinataStore::new(
        &config.ipfs,
        secret_from_env(PINATA_JWT_ENV_VAR),
        upstream,
    )?);
    let relay: SharedRelay = Arc::new(SendGridRelay::new(
        &config.sendgrid,
        secret_from_env(SENDGRID_KEY_ENV_VAR),
        upstream,
    )?);

    assemble(
        config,
        Backends {
            mailer,
            content,
            relay,
            chain,
        },
    )
}

async fn connect_chain(
    config: &BlockchainConfig,
) -> Result<(SharedMailer, Option<BlockchainClient>), StartupError> {
    if !config.enabled {
        tracing::warn!("Blockchain integration disabled; mail indexing and wallets are unavailable");
        return Ok((Arc::new(UnavailableMailer), None));
    }

    let address: Address = config
        .contract_address
        .parse()
        .map_err(|_| StartupError::ContractAddress(config.contract_address.clone()))?;

    let wallet = match Wallet::from_env(config.chain_id) {
        Ok(wallet) => {
            tracing::info!(relayer = %wallet.address(), "Relayer wallet loaded");
            Some(wallet)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Relayer wallet unavailable; running read-only");
            None
        }
    };

    let client = BlockchainClient::new(config.clone(), wallet).await?;
    Ok((Arc::new(OnChainMailer::new(client.clone(), address)), Some(client)))
}

/// Open the local stores and wire services over the given backends.
pub fn assemble(config: DexmailConfig, backends: Backends) -> Result<AppState, StartupError> {
    let data_dir = config.storage.data_dir.as_deref();
    let upstream = Duration::from_secs(config.timeouts.upstream_secs);

    let wallets = WalletService::new(backends.mailer.clone());
    let claims = ClaimService::new(
        JsonStore::open("claims", data_dir)?.write_through(),
        wallets.clone(),
        config.claim.clone(),
        config.retries.clone(),
    );
    let auth = AuthService::new(
        JsonStore::open("users", data_dir)?,
        SessionStore::open(data_dir, config.auth.session_ttl_secs)?,
        backends.mailer.clone(),
        config.auth.challenge_ttl_secs,
    );
    let mail = MailService::new(
        backends.mailer.clone(),
        backends.content.clone(),
        CidRegistry::open(data_dir)?,
        claims.clone(),
        JsonStore::open("mail_flags", data_dir)?,
        JsonStore::open("sent_mail", data_dir)?,
    );
    let price = PriceService::new(&config.price, upstream)?;
    let nfts = NftService::new(&config.nft, secret_from_env(NFT_KEY_ENV_VAR), upstream)?;

    tracing::info!(
        users = auth.user_count(),
        data_dir = data_dir.unwrap_or("<memory>"),
        "Services initialized"
    );

    Ok(AppState {
        config: Arc::new(config),
        auth,
        mail,
        claims,
        wallets,
        price,
        nfts,
        relay: backends.relay,
        content: backends.content,
        chain: backends.chain,
    })
}
