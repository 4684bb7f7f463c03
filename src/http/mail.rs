//! `/api/mail/*` handlers. Every route acts as the session user.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::normalize_email;
use crate::http::error::ApiError;
use crate::http::extract::AuthSession;
use crate::http::server::AppState;
use crate::mail::{
    DeleteResponse, FlagAction, FolderView, MailFlags, MailMessage, MessageDetail, SendEmailData,
    SendEmailResponse,
};

pub async fn send(
    State(state): State<AppState>,
    session: AuthSession,
    Json(mut data): Json<SendEmailData>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    if data.from.trim().is_empty() {
        data.from = session.email.clone();
    } else if normalize_email(&data.from) != session.email {
        return Err(ApiError::forbidden("Sender does not match the signed-in user"));
    }
    Ok(Json(state.mail.send_email(data).await?))
}

pub async fn inbox(State(state): State<AppState>, session: AuthSession) -> Json<Vec<MailMessage>> {
    Json(state.mail.get_inbox(&session.email).await)
}

pub async fn sent(State(state): State<AppState>, session: AuthSession) -> Json<Vec<MailMessage>> {
    Json(state.mail.get_sent(&session.email))
}

pub async fn unread(State(state): State<AppState>, session: AuthSession) -> Json<Value> {
    let count = state.mail.unread_count(&session.email).await;
    Json(json!({ "count": count }))
}

pub async fn folder(
    State(state): State<AppState>,
    session: AuthSession,
    Path(folder): Path<String>,
) -> Result<Json<Vec<MailMessage>>, ApiError> {
    let view: FolderView = folder.parse().map_err(ApiError::bad_request)?;
    Ok(Json(state.mail.list_folder(&session.email, view).await))
}

pub async fn message(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<u64>,
) -> Result<Json<MessageDetail>, ApiError> {
    Ok(Json(state.mail.get_message_detail(id, &session.email).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<u64>,
) -> Json<DeleteResponse> {
    Json(state.mail.delete_message(id, &session.email))
}

pub async fn flag(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<u64>,
    Json(action): Json<FlagAction>,
) -> Json<MailFlags> {
    Json(state.mail.apply_flag(id, &session.email, &action))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub body: String,
}

pub async fn reply(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<u64>,
    Json(request): Json<ReplyRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    Ok(Json(state.mail.reply(id, &session.email, &request.body).await?))
}

#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    pub to: Vec<String>,
    #[serde(default)]
    pub body: String,
}

pub async fn forward(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<u64>,
    Json(request): Json<ForwardRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    Ok(Json(
        state
            .mail
            .forward(id, &session.email, request.to, &request.body)
            .await?,
    ))
}
