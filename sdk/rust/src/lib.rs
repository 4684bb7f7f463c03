//! Minimal async client for the DexMail API.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {error}")]
    Api { status: StatusCode, error: String },
}

impl SdkError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            SdkError::Http(e) => e.status(),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Challenge {
    pub nonce: String,
    pub expires: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub auth_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Credentials {
    pub fn password(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: Some(password.to_string()),
            auth_type: "traditional".to_string(),
            ..Default::default()
        }
    }

    pub fn wallet(email: &str, wallet_address: &str, signature: Option<String>) -> Self {
        Self {
            email: email.to_string(),
            auth_type: "wallet".to_string(),
            wallet_address: Some(wallet_address.to_string()),
            signature,
            ..Default::default()
        }
    }
}

/// Client bound to one server; carries the session token once logged in.
#[derive(Debug, Clone)]
pub struct DexmailClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl DexmailClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> SdkResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(SdkError::Api { status, error });
        }
        Ok(response.json().await?)
    }

    pub async fn health(&self) -> SdkResult<Value> {
        self.send(self.request(Method::GET, "/health")).await
    }

    pub async fn challenge(&self, email: &str) -> SdkResult<Challenge> {
        self.send(self.request(Method::POST, "/api/auth/challenge").json(&json!({ "email": email })))
            .await
    }

    /// Register and keep the returned session.
    pub async fn register(&mut self, credentials: &Credentials) -> SdkResult<Session> {
        let session: Session = self
            .send(self.request(Method::POST, "/api/auth/register").json(credentials))
            .await?;
        self.token = Some(session.token.clone());
        Ok(session)
    }

    /// Log in and keep the returned session.
    pub async fn login(&mut self, credentials: &Credentials) -> SdkResult<Session> {
        let session: Session = self
            .send(self.request(Method::POST, "/api/auth/login").json(credentials))
            .await?;
        self.token = Some(session.token.clone());
        Ok(session)
    }

    pub async fn logout(&mut self) -> SdkResult<()> {
        let _: Value = self.send(self.request(Method::POST, "/api/auth/logout")).await?;
        self.token = None;
        Ok(())
    }

    pub async fn profile(&self) -> SdkResult<Value> {
        self.send(self.request(Method::GET, "/api/auth/profile")).await
    }

    /// Send a message. `email` is the JSON body of `POST /api/mail/send`.
    pub async fn send_email(&self, email: &Value) -> SdkResult<Value> {
        self.send(self.request(Method::POST, "/api/mail/send").json(email)).await
    }

    pub async fn inbox(&self) -> SdkResult<Vec<Value>> {
        self.send(self.request(Method::GET, "/api/mail/inbox")).await
    }

    pub async fn sent(&self) -> SdkResult<Vec<Value>> {
        self.send(self.request(Method::GET, "/api/mail/sent")).await
    }

    pub async fn folder(&self, folder: &str) -> SdkResult<Vec<Value>> {
        self.send(self.request(Method::GET, &format!("/api/mail/folders/{folder}")))
            .await
    }

    pub async fn message(&self, id: u64) -> SdkResult<Value> {
        self.send(self.request(Method::GET, &format!("/api/mail/{id}"))).await
    }

    /// Apply a flag action such as `{"action": "star"}`.
    pub async fn flag(&self, id: u64, action: &Value) -> SdkResult<Value> {
        self.send(self.request(Method::POST, &format!("/api/mail/{id}/flags")).json(action))
            .await
    }

    pub async fn reply(&self, id: u64, body: &str) -> SdkResult<Value> {
        self.send(
            self.request(Method::POST, &format!("/api/mail/{id}/reply"))
                .json(&json!({ "body": body })),
        )
        .await
    }

    pub async fn claim(&self, token: &str) -> SdkResult<Value> {
        self.send(self.request(Method::GET, &format!("/api/claim/{token}"))).await
    }

    pub async fn claim_status(&self, token: &str) -> SdkResult<Value> {
        self.send(self.request(Method::GET, &format!("/api/claim/{token}/status")))
            .await
    }

    pub async fn verify_claim_code(&self, token: &str, code: &str) -> SdkResult<Value> {
        self.send(
            self.request(Method::POST, &format!("/api/claim/{token}/code"))
                .json(&json!({ "code": code })),
        )
        .await
    }

    pub async fn deploy_claim(&self, token: &str, owner_address: &str) -> SdkResult<Value> {
        self.send(
            self.request(Method::POST, "/api/claim/deploy")
                .json(&json!({ "token": token, "ownerAddress": owner_address })),
        )
        .await
    }

    pub async fn eth_price(&self) -> SdkResult<Value> {
        self.send(self.request(Method::GET, "/api/price/eth")).await
    }
}
