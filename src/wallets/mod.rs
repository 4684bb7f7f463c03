//! Embedded wallet deployment.
//!
//! Each email maps to a deterministic smart-wallet address computed by the
//! mailer contract. `claimWallet` deploys it and assigns an owner.

pub mod service;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::BlockchainError;

pub use service::WalletService;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Invalid owner address: {0}")]
    InvalidOwner(String),

    #[error(transparent)]
    Chain(#[from] BlockchainError),
}

impl WalletError {
    pub fn is_transient(&self) -> bool {
        match self {
            WalletError::Chain(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployWalletData {
    pub email: String,
    pub owner_address: String,
    #[serde(default)]
    pub use_gas_sponsoring: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployWalletResponse {
    pub success: bool,
    pub wallet_address: String,
    pub transaction_hash: String,
    pub already_deployed: bool,
    pub gas_sponsored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub email: String,
    /// Deployed wallet when it exists, otherwise the computed address.
    pub wallet_address: String,
    pub is_deployed: bool,
    pub owner: Option<String>,
    pub computed_address: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeploymentResult {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeploymentResponse {
    pub success: bool,
    pub deployments: Vec<BatchDeploymentResult>,
    pub success_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCostEstimate {
    pub gas_estimate: String,
    #[serde(rename = "costInETH")]
    pub cost_in_eth: String,
    pub can_use_gas_sponsoring: bool,
}
