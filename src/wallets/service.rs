use alloy::primitives::{Address, Bytes};

use crate::auth::{is_valid_email, is_valid_wallet_address, normalize_email};
use crate::blockchain::SharedMailer;
use crate::wallets::{
    BatchDeploymentResponse, BatchDeploymentResult, DeployWalletData, DeployWalletResponse,
    DeploymentCostEstimate, WalletError, WalletInfo,
};

/// Contract-backed wallet operations.
#[derive(Clone)]
pub struct WalletService {
    mailer: SharedMailer,
}

impl WalletService {
    pub fn new(mailer: SharedMailer) -> Self {
        Self { mailer }
    }

    fn checked_email(email: &str) -> Result<String, WalletError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(WalletError::InvalidEmail(email));
        }
        Ok(email)
    }

    /// Deploy the wallet for `data.email` owned by `data.owner_address`.
    ///
    /// A failed deployment whose wallet turns out to exist already is
    /// reported as success with `already_deployed` set.
    pub async fn deploy_wallet(&self, data: &DeployWalletData) -> Result<DeployWalletResponse, WalletError> {
        let email = Self::checked_email(&data.email)?;
        if !is_valid_wallet_address(&data.owner_address) {
            return Err(WalletError::InvalidOwner(data.owner_address.clone()));
        }
        let owner: Address = data
            .owner_address
            .parse()
            .map_err(|_| WalletError::InvalidOwner(data.owner_address.clone()))?;

        if data.use_gas_sponsoring {
            tracing::debug!(email = %email, "Gas sponsoring requested but not offered");
        }

        match self.mailer.claim_wallet(&email, owner, Bytes::new()).await {
            Ok(tx_hash) => {
                let wallet = self.mailer.compute_wallet_address(&email).await?;
                tracing::info!(email = %email, wallet = %wallet, tx_hash = %tx_hash, "Wallet deployed");
                Ok(DeployWalletResponse {
                    success: true,
                    wallet_address: wallet.to_string(),
                    transaction_hash: tx_hash.to_string(),
                    already_deployed: false,
                    gas_sponsored: false,
                })
            }
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "claimWallet failed, checking for existing wallet");
                let wallet = match self.mailer.compute_wallet_address(&email).await {
                    Ok(wallet) => wallet,
                    Err(_) => return Err(e.into()),
                };
                if self.mailer.is_wallet_deployed(wallet).await.unwrap_or(false) {
                    return Ok(DeployWalletResponse {
                        success: true,
                        wallet_address: wallet.to_string(),
                        transaction_hash: String::new(),
                        already_deployed: true,
                        gas_sponsored: false,
                    });
                }
                Err(e.into())
            }
        }
    }

    pub async fn get_wallet_info(&self, email: &str) -> Result<WalletInfo, WalletError> {
        let email = Self::checked_email(email)?;
        let computed = self.mailer.compute_wallet_address(&email).await?;

        let (is_deployed, owner, email_hash) = tokio::try_join!(
            self.mailer.is_wallet_deployed(computed),
            self.mailer.email_owner(&email),
            self.mailer.compute_wallet_hash(&email),
        )?;

        let wallet_address = if is_deployed {
            self.mailer.wallet_address(email_hash).await?
        } else {
            computed
        };

        Ok(WalletInfo {
            email,
            wallet_address: wallet_address.to_string(),
            is_deployed,
            owner: (owner != Address::ZERO).then(|| owner.to_string()),
            computed_address: computed.to_string(),
        })
    }

    pub async fn is_wallet_deployed(&self, email: &str) -> Result<bool, WalletError> {
        let address = self.computed_wallet_address(email).await?;
        Ok(self.mailer.is_wallet_deployed(address).await?)
    }

    pub async fn computed_wallet_address(&self, email: &str) -> Result<Address, WalletError> {
        let email = Self::checked_email(email)?;
        Ok(self.mailer.compute_wallet_address(&email).await?)
    }

    /// Deploy several wallets one after another, reporting each outcome.
    pub async fn batch_deploy_wallets(&self, deployments: &[DeployWalletData]) -> BatchDeploymentResponse {
        let mut results = Vec::with_capacity(deployments.len());
        for data in deployments {
            let result = match self.deploy_wallet(data).await {
                Ok(deployed) => BatchDeploymentResult {
                    email: data.email.clone(),
                    success: true,
                    wallet_address: Some(deployed.wallet_address),
                    transaction_hash: Some(deployed.transaction_hash),
                    error: None,
                },
                Err(e) => BatchDeploymentResult {
                    email: data.email.clone(),
                    success: false,
                    wallet_address: None,
                    transaction_hash: None,
                    error: Some(e.to_string()),
                },
            };
            results.push(result);
        }

        let success_count = results.iter().filter(|r| r.success).count();
        tracing::info!(success_count, total = results.len(), "Batch wallet deployment finished");
        BatchDeploymentResponse {
            success: success_count == results.len(),
            total_count: results.len(),
            success_count,
            deployments: results,
        }
    }

    pub fn estimate_deployment_cost(&self) -> DeploymentCostEstimate {
        DeploymentCostEstimate {
            gas_estimate: "200000".to_string(),
            cost_in_eth: "0.005".to_string(),
            can_use_gas_sponsoring: false,
        }
    }
}
