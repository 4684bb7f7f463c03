use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Erc20,
    Eth,
    Nft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoAsset {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimState {
    Pending,
    Verified,
    Claimed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub token: String,
    pub code: String,
    pub email: String,
    pub assets: Vec<CryptoAsset>,
    pub status: ClaimState,
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub claimed_tx: Option<String>,
    #[serde(default)]
    pub failed_attempts: u32,
}

impl ClaimRecord {
    /// Stored status with expiry applied. Completed claims never expire.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ClaimState {
        match self.status {
            ClaimState::Pending | ClaimState::Verified if now >= self.expires_at => ClaimState::Expired,
            status => status,
        }
    }
}

/// Public view of a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatus {
    pub token: String,
    pub status: ClaimState,
    pub email: String,
    pub wallet_address: String,
    pub assets: Vec<CryptoAsset>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimVerification {
    pub valid: bool,
    pub email: String,
    pub assets: Vec<CryptoAsset>,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDeploymentData {
    pub token: String,
    pub owner_address: String,
    #[serde(default)]
    pub use_gas_sponsoring: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDeploymentResponse {
    pub success: bool,
    pub wallet_address: String,
    pub assets: Vec<CryptoAsset>,
    pub transaction_hash: String,
    pub gas_sponsored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSummary {
    pub total_assets: usize,
    #[serde(rename = "hasERC20")]
    pub has_erc20: bool,
    #[serde(rename = "hasNFT")]
    pub has_nft: bool,
    #[serde(rename = "hasETH")]
    pub has_eth: bool,
    /// Whole hours left before expiry.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeUntilExpiration {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub is_expired: bool,
}

/// What a sender gets back for a message with attached assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTicket {
    pub email: String,
    pub token: String,
    pub code: String,
    pub claim_url: String,
}
