use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use rand::Rng;

use crate::claim::{
    AssetKind, ClaimDeploymentData, ClaimDeploymentResponse, ClaimError, ClaimRecord, ClaimState,
    ClaimStatus, ClaimSummary, ClaimTicket, ClaimVerification, CryptoAsset, TimeUntilExpiration,
};
use crate::config::{ClaimConfig, RetryConfig};
use crate::observability::metrics;
use crate::resilience::retry_with_backoff;
use crate::storage::{JsonStore, StoreError};
use crate::wallets::{DeployWalletData, WalletService};

/// Claim tokens are 32 random bytes as lowercase hex.
pub fn is_valid_claim_token_format(token: &str) -> bool {
    token.len() == 64 && token.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

pub fn claim_url(token: &str, base_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!("{}/dashboard/claim?token={}", base_url.trim_end_matches('/'), encoded)
}

pub fn format_assets_for_display(assets: &[CryptoAsset]) -> Vec<String> {
    assets
        .iter()
        .map(|asset| match asset.kind {
            AssetKind::Erc20 => format!("{} {}", asset.amount, asset.symbol),
            AssetKind::Eth => format!("{} ETH", asset.amount),
            AssetKind::Nft => format!("NFT #{}", asset.token_id.as_deref().unwrap_or_default()),
        })
        .collect()
}

fn status_view(record: &ClaimRecord, now: DateTime<Utc>) -> ClaimStatus {
    let status = record.effective_status(now);
    ClaimStatus {
        token: record.token.clone(),
        status,
        email: record.email.clone(),
        wallet_address: record.wallet_address.clone().unwrap_or_default(),
        assets: record.assets.clone(),
        expires_at: record.expires_at,
        is_expired: status == ClaimState::Expired,
    }
}

/// Marks a token as mid-deployment until dropped.
struct InFlight<'a> {
    tokens: &'a DashSet<String>,
    token: String,
}

impl<'a> InFlight<'a> {
    fn acquire(tokens: &'a DashSet<String>, token: &str) -> Option<Self> {
        tokens.insert(token.to_string()).then(|| Self {
            tokens,
            token: token.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.tokens.remove(&self.token);
    }
}

#[derive(Clone)]
pub struct ClaimService {
    claims: JsonStore<String, ClaimRecord>,
    in_flight: Arc<DashSet<String>>,
    wallets: WalletService,
    retry: RetryConfig,
    config: ClaimConfig,
}

impl ClaimService {
    pub fn new(
        claims: JsonStore<String, ClaimRecord>,
        wallets: WalletService,
        config: ClaimConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            claims,
            in_flight: Arc::new(DashSet::new()),
            wallets,
            retry,
            config,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_secs as i64)
    }

    fn record(&self, token: &str) -> Result<ClaimRecord, ClaimError> {
        if !is_valid_claim_token_format(token) {
            return Err(ClaimError::InvalidToken);
        }
        self.claims.get(&token.to_string()).ok_or(ClaimError::NotFound)
    }

    pub fn create_claim(&self, email: &str, assets: Vec<CryptoAsset>) -> ClaimRecord {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        let record = ClaimRecord {
            token: alloy::hex::encode(rng.gen::<[u8; 32]>()),
            code: format!("{:06}", rng.gen_range(0..1_000_000u32)),
            email: email.to_string(),
            assets,
            status: ClaimState::Pending,
            wallet_address: None,
            created_at: now,
            expires_at: now + self.ttl(),
            claimed_tx: None,
            failed_attempts: 0,
        };
        self.claims.insert(record.token.clone(), record.clone());
        metrics::record_claim_event("created");
        tracing::info!(email = %email, assets = record.assets.len(), "Claim created");
        record
    }

    /// Drop a claim whose notification never went out.
    pub fn discard_claim(&self, token: &str) {
        if self.claims.remove(&token.to_string()).is_some() {
            metrics::record_claim_event("discarded");
            tracing::info!("Discarded undelivered claim");
        }
    }

    pub fn ticket(&self, record: &ClaimRecord) -> ClaimTicket {
        ClaimTicket {
            email: record.email.clone(),
            token: record.token.clone(),
            code: record.code.clone(),
            claim_url: self.claim_url(&record.token),
        }
    }

    pub fn claim_url(&self, token: &str) -> String {
        claim_url(token, &self.config.base_url)
    }

    pub fn verify_claim_token(&self, token: &str) -> ClaimVerification {
        let now = Utc::now();
        match self.record(token) {
            Ok(record) => ClaimVerification {
                valid: matches!(
                    record.effective_status(now),
                    ClaimState::Pending | ClaimState::Verified
                ),
                email: record.email,
                assets: record.assets,
                wallet_address: record.wallet_address.unwrap_or_default(),
            },
            Err(_) => ClaimVerification {
                valid: false,
                email: String::new(),
                assets: Vec::new(),
                wallet_address: String::new(),
            },
        }
    }

    /// Check the six-digit code. Whitespace in `code` is ignored.
    ///
    /// After `max_code_attempts` wrong codes the claim stops accepting
    /// codes, including the right one.
    pub fn verify_claim_code(&self, token: &str, code: &str) -> Result<ClaimStatus, ClaimError> {
        if !is_valid_claim_token_format(token) {
            return Err(ClaimError::InvalidToken);
        }
        let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
        let now = Utc::now();

        let outcome = {
            let mut stored = self.claims.get_mut(&token.to_string()).ok_or(ClaimError::NotFound)?;
            match stored.effective_status(now) {
                ClaimState::Expired => return Err(ClaimError::Expired),
                ClaimState::Claimed => return Err(ClaimError::AlreadyClaimed),
                ClaimState::Pending | ClaimState::Verified => {}
            }
            if stored.failed_attempts >= self.config.max_code_attempts {
                return Err(ClaimError::TooManyAttempts);
            }

            if code == stored.code {
                if stored.status == ClaimState::Pending {
                    stored.status = ClaimState::Verified;
                    metrics::record_claim_event("verified");
                }
                Ok(status_view(&stored, now))
            } else {
                stored.failed_attempts += 1;
                metrics::record_claim_event("rejected");
                tracing::info!(
                    email = %stored.email,
                    attempts = stored.failed_attempts,
                    "Claim code mismatch"
                );
                Err(ClaimError::InvalidCode)
            }
        };
        self.claims.commit();
        outcome
    }

    pub fn get_claim_status(&self, token: &str) -> Result<ClaimStatus, ClaimError> {
        self.record(token).map(|record| status_view(&record, Utc::now()))
    }

    pub fn is_claim_token_valid(&self, token: &str) -> bool {
        self.verify_claim_token(token).valid
    }

    /// Deploy the recipient's wallet and mark the claim complete.
    ///
    /// Only one deployment per token runs at a time; a concurrent call
    /// fails with [`ClaimError::InProgress`].
    pub async fn deploy_and_claim(&self, data: &ClaimDeploymentData) -> Result<ClaimDeploymentResponse, ClaimError> {
        if !is_valid_claim_token_format(&data.token) {
            return Err(ClaimError::InvalidToken);
        }
        let _in_flight = InFlight::acquire(&self.in_flight, &data.token).ok_or(ClaimError::InProgress)?;
        let record = self.record(&data.token)?;
        match record.effective_status(Utc::now()) {
            ClaimState::Expired => return Err(ClaimError::Expired),
            ClaimState::Claimed => return Err(ClaimError::AlreadyClaimed),
            ClaimState::Pending => return Err(ClaimError::NotVerified),
            ClaimState::Verified => {}
        }

        let deployed = self
            .wallets
            .deploy_wallet(&DeployWalletData {
                email: record.email.clone(),
                owner_address: data.owner_address.clone(),
                use_gas_sponsoring: data.use_gas_sponsoring,
            })
            .await?;

        if let Some(mut stored) = self.claims.get_mut(&record.token) {
            stored.status = ClaimState::Claimed;
            stored.wallet_address = Some(deployed.wallet_address.clone());
            stored.claimed_tx = Some(deployed.transaction_hash.clone()).filter(|tx| !tx.is_empty());
        }
        self.claims.commit();
        metrics::record_claim_event("claimed");
        tracing::info!(
            email = %record.email,
            wallet = %deployed.wallet_address,
            already_deployed = deployed.already_deployed,
            "Claim completed"
        );

        Ok(ClaimDeploymentResponse {
            success: deployed.success,
            wallet_address: deployed.wallet_address,
            assets: record.assets,
            transaction_hash: deployed.transaction_hash,
            gas_sponsored: deployed.gas_sponsored,
        })
    }

    /// [`deploy_and_claim`](Self::deploy_and_claim), retrying chain failures.
    pub async fn deploy_and_claim_with_retry(
        &self,
        data: &ClaimDeploymentData,
        max_retries: u32,
    ) -> Result<ClaimDeploymentResponse, ClaimError> {
        retry_with_backoff(&self.retry, max_retries, ClaimError::is_transient, |_| {
            self.deploy_and_claim(data)
        })
        .await
    }

    pub fn get_claim_summary(&self, token: &str) -> Result<ClaimSummary, ClaimError> {
        let record = self.record(token)?;
        let has = |kind| record.assets.iter().any(|a| a.kind == kind);
        Ok(ClaimSummary {
            total_assets: record.assets.len(),
            has_erc20: has(AssetKind::Erc20),
            has_nft: has(AssetKind::Nft),
            has_eth: has(AssetKind::Eth),
            expires_in: (record.expires_at - Utc::now()).num_hours().max(0),
        })
    }

    pub fn time_until_expiration(&self, status: &ClaimStatus) -> TimeUntilExpiration {
        time_until_expiration(status, Utc::now())
    }

    pub fn is_claim_expiring_soon(&self, status: &ClaimStatus) -> bool {
        let remaining = status.expires_at - Utc::now();
        !status.is_expired
            && remaining > Duration::zero()
            && remaining < Duration::seconds(self.config.expiring_soon_secs as i64)
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.claims.save()
    }
}

pub fn time_until_expiration(status: &ClaimStatus, now: DateTime<Utc>) -> TimeUntilExpiration {
    let remaining = status.expires_at - now;
    if status.is_expired || remaining <= Duration::zero() {
        return TimeUntilExpiration {
            days: 0,
            hours: 0,
            minutes: 0,
            is_expired: true,
        };
    }

    let minutes = remaining.num_minutes();
    TimeUntilExpiration {
        days: minutes / (24 * 60),
        hours: (minutes / 60) % 24,
        minutes: minutes % 60,
        is_expired: false,
    }
}
