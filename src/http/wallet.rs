//! `/api/wallet/*` handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::normalize_email;
use crate::http::error::ApiError;
use crate::http::extract::AuthSession;
use crate::http::server::AppState;
use crate::wallets::{
    BatchDeploymentResponse, DeployWalletData, DeployWalletResponse, DeploymentCostEstimate,
    WalletInfo,
};

pub async fn info(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<WalletInfo>, ApiError> {
    Ok(Json(state.wallets.get_wallet_info(&email).await?))
}

/// Deployment spends relayer gas and fixes the wallet owner, so callers may
/// only deploy the wallet of the address they are signed in as.
fn ensure_own_wallet(session: &AuthSession, data: &DeployWalletData) -> Result<(), ApiError> {
    if normalize_email(&data.email) != session.email {
        return Err(ApiError::forbidden("Cannot deploy a wallet for another user"));
    }
    Ok(())
}

pub async fn deploy(
    State(state): State<AppState>,
    session: AuthSession,
    Json(data): Json<DeployWalletData>,
) -> Result<Json<DeployWalletResponse>, ApiError> {
    ensure_own_wallet(&session, &data)?;
    Ok(Json(state.wallets.deploy_wallet(&data).await?))
}

#[derive(Debug, Deserialize)]
pub struct BatchDeployRequest {
    pub deployments: Vec<DeployWalletData>,
}

pub async fn batch_deploy(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<BatchDeployRequest>,
) -> Result<Json<BatchDeploymentResponse>, ApiError> {
    if request.deployments.is_empty() {
        return Err(ApiError::bad_request("No deployments given"));
    }
    for data in &request.deployments {
        ensure_own_wallet(&session, data)?;
    }
    Ok(Json(state.wallets.batch_deploy_wallets(&request.deployments).await))
}

pub async fn estimate(State(state): State<AppState>, Path(_email): Path<String>) -> Json<DeploymentCostEstimate> {
    Json(state.wallets.estimate_deployment_cost())
}
