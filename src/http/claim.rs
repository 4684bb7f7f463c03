//! `/api/claim/*` handlers. Claim routes are public; the token is the
//! credential.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::claim::{
    ClaimDeploymentData, ClaimDeploymentResponse, ClaimStatus, ClaimSummary, ClaimVerification,
    TimeUntilExpiration,
};
use crate::http::error::ApiError;
use crate::http::server::AppState;

pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Json<ClaimVerification> {
    Json(state.claims.verify_claim_token(&token))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatusResponse {
    #[serde(flatten)]
    pub status: ClaimStatus,
    pub time_until_expiration: TimeUntilExpiration,
    pub expiring_soon: bool,
}

pub async fn status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ClaimStatusResponse>, ApiError> {
    let status = state.claims.get_claim_status(&token)?;
    Ok(Json(ClaimStatusResponse {
        time_until_expiration: state.claims.time_until_expiration(&status),
        expiring_soon: state.claims.is_claim_expiring_soon(&status),
        status,
    }))
}

pub async fn summary(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ClaimSummary>, ApiError> {
    Ok(Json(state.claims.get_claim_summary(&token)?))
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

pub async fn verify_code(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<ClaimStatus>, ApiError> {
    Ok(Json(state.claims.verify_claim_code(&token, &request.code)?))
}

pub async fn deploy(
    State(state): State<AppState>,
    Json(data): Json<ClaimDeploymentData>,
) -> Result<Json<ClaimDeploymentResponse>, ApiError> {
    let attempts = state.config.retries.max_attempts;
    Ok(Json(state.claims.deploy_and_claim_with_retry(&data, attempts).await?))
}
