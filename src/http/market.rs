//! Price, NFT, IPFS upload and outbound relay handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::normalize_email;
use crate::http::error::ApiError;
use crate::http::extract::AuthSession;
use crate::http::server::AppState;
use crate::market::{Nft, PriceData};
use crate::relay::{relay_email, RelayRequest};

pub async fn eth_price(State(state): State<AppState>) -> Json<PriceData> {
    Json(state.price.eth_price().await)
}

#[derive(Debug, Deserialize)]
pub struct NftQuery {
    pub address: Option<String>,
}

/// A missing or blank address yields an empty list.
pub async fn nfts(State(state): State<AppState>, Query(query): Query<NftQuery>) -> Json<Vec<Nft>> {
    let address = query.address.unwrap_or_default();
    Json(state.nfts.nfts(address.trim()).await)
}

pub async fn upload(
    State(state): State<AppState>,
    _session: AuthSession,
    Json(document): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let name = format!("upload-{}", chrono::Utc::now().timestamp_millis());
    let cid = state.content.put_json(&name, &document).await?;
    Ok(Json(json!({ "cid": cid })))
}

/// Relay on behalf of the signed-in user. A `from` naming anyone else is
/// refused.
pub async fn sendgrid(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<RelayRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Some(from) = &request.from {
        let sender = normalize_email(from.email());
        if !sender.is_empty() && sender != session.email {
            return Err(ApiError::forbidden("Sender does not match the signed-in user"));
        }
    }
    relay_email(state.relay.as_ref(), request).await?;
    Ok(Json(json!({ "success": true })))
}
