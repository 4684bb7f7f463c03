//! User accounts, sessions and wallet-signature login.
//!
//! # Flows
//! ```text
//! traditional: register(email, password) → argon2 hash → session token
//! wallet:      challenge(email) → nonce → wallet signs nonce (EIP-191)
//!              → login(email, signature) → recover signer == linked wallet
//!              → nonce consumed → session token
//! ```

pub mod password;
pub mod service;
pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use service::AuthService;
pub use session::SessionStore;

/// Mail domain handed out to basename users.
pub const DEFAULT_MAIL_DOMAIN: &str = "@dexmail.app";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    BadRequest(String),

    #[error("User already exists with this email")]
    UserExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Challenge expired or missing")]
    ChallengeExpired,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    fn bad_request(message: &str) -> Self {
        AuthError::BadRequest(message.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Traditional,
    Wallet,
}

/// A stored account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub auth_type: AuthType,
    pub wallet_address: Option<String>,
    pub email_verified: bool,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// The account as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub email: String,
    pub auth_type: AuthType,
    pub wallet_address: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            auth_type: user.auth_type,
            wallet_address: user.wallet_address.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    #[serde(default)]
    pub email: String,
    pub password: Option<String>,
    pub auth_type: Option<AuthType>,
    pub wallet_address: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub email: String,
    pub password: Option<String>,
    pub signature: Option<String>,
    pub auth_type: Option<AuthType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub nonce: String,
    /// Expiry in unix milliseconds.
    pub expires: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileData {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkWalletData {
    pub wallet_address: String,
    pub signature: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose `local@domain.tld` check.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let clean = |s: &str| !s.is_empty() && !s.contains('@') && !s.chars().any(char::is_whitespace);
    if !clean(local) || !clean(domain) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_valid_wallet_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

pub fn email_from_basename(basename: &str, domain: Option<&str>) -> String {
    format!("{}{}", basename.trim(), domain.unwrap_or(DEFAULT_MAIL_DOMAIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@dexmail.app"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@localhost"));
        assert!(!is_valid_email("al ice@dexmail.app"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("@dexmail.app"));
        assert!(!is_valid_email("alice@.app"));
    }

    #[test]
    fn test_wallet_address_validation() {
        assert!(is_valid_wallet_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(!is_valid_wallet_address("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(!is_valid_wallet_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226"));
        assert!(!is_valid_wallet_address("0xg39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    }

    #[test]
    fn test_email_from_basename() {
        assert_eq!(email_from_basename("alice", None), "alice@dexmail.app");
        assert_eq!(email_from_basename("bob", Some("@base.mail")), "bob@base.mail");
    }

    #[test]
    fn test_user_response_hides_password() {
        let user = User {
            email: "alice@dexmail.app".to_string(),
            auth_type: AuthType::Traditional,
            wallet_address: None,
            email_verified: false,
            password_hash: Some("$argon2id$secret".to_string()),
            created_at: Utc::now(),
            last_login: None,
        };
        let json = serde_json::to_string(&UserResponse::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"authType\":\"traditional\""));
        assert!(!json.contains("lastLogin"));
    }
}
