//! `/api/auth/*` handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{
    AuthResponse, ChallengeRequest, ChallengeResponse, LinkWalletData, LoginData, RegisterData,
    UpdateProfileData, UserResponse,
};
use crate::http::error::ApiError;
use crate::http::extract::AuthSession;
use crate::http::server::AppState;

pub async fn challenge(
    State(state): State<AppState>,
    Json(request): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    Ok(Json(state.auth.challenge(&request.email)?))
}

pub async fn register(
    State(state): State<AppState>,
    Json(data): Json<RegisterData>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = state.auth.register(data).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(data): Json<LoginData>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(state.auth.login(data).await?))
}

pub async fn logout(State(state): State<AppState>, session: AuthSession) -> Json<Value> {
    state.auth.logout(&session.token);
    Json(json!({ "success": true }))
}

pub async fn profile(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.auth.profile(&session.token)?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: AuthSession,
    Json(data): Json<UpdateProfileData>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.auth.update_profile(&session.token, data)?))
}

pub async fn link_wallet(
    State(state): State<AppState>,
    session: AuthSession,
    Json(data): Json<LinkWalletData>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.auth.link_wallet(&session.token, data)?))
}
