use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::SessionStore;
use crate::auth::{
    is_valid_email, is_valid_wallet_address, normalize_email, AuthError, AuthResponse, AuthType,
    ChallengeResponse, LinkWalletData, LoginData, RegisterData, UpdateProfileData, User,
    UserResponse,
};
use crate::blockchain::{recover_signer, SharedMailer};
use crate::storage::{JsonStore, StoreError};

/// Prefix of every wallet-login nonce.
pub const CHALLENGE_PREFIX: &str = "Sign this message to authenticate with DexMail: ";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    users: JsonStore<String, User>,
    challenges: JsonStore<String, Challenge>,
    sessions: SessionStore,
    mailer: SharedMailer,
    challenge_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: JsonStore<String, User>,
        sessions: SessionStore,
        mailer: SharedMailer,
        challenge_ttl_secs: u64,
    ) -> Self {
        Self {
            users,
            challenges: JsonStore::in_memory("challenges"),
            sessions,
            mailer,
            challenge_ttl: Duration::seconds(challenge_ttl_secs as i64),
        }
    }

    /// Issue a fresh nonce for `email`, replacing any outstanding one.
    pub fn challenge(&self, email: &str) -> Result<ChallengeResponse, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::bad_request("Email is required"));
        }

        let now = Utc::now();
        let challenge = Challenge {
            nonce: format!("{}{}", CHALLENGE_PREFIX, now.timestamp_millis()),
            expires_at: now + self.challenge_ttl,
        };
        self.challenges.insert(email.clone(), challenge.clone());
        tracing::debug!(email = %email, "Issued login challenge");

        Ok(ChallengeResponse {
            nonce: challenge.nonce,
            expires: challenge.expires_at.timestamp_millis(),
        })
    }

    pub async fn register(&self, data: RegisterData) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&data.email);
        let Some(auth_type) = data.auth_type.filter(|_| !email.is_empty()) else {
            return Err(AuthError::bad_request("Email and authType are required"));
        };
        if !is_valid_email(&email) {
            return Err(AuthError::bad_request("Invalid email address"));
        }
        if self.users.contains(&email) {
            return Err(AuthError::UserExists);
        }

        let password = data.password.filter(|p| !p.is_empty());
        let wallet_address = data.wallet_address.filter(|w| !w.trim().is_empty());
        match auth_type {
            AuthType::Traditional if password.is_none() => {
                return Err(AuthError::bad_request(
                    "Password is required for traditional registration",
                ));
            }
            AuthType::Wallet if wallet_address.is_none() => {
                return Err(AuthError::bad_request(
                    "Wallet address is required for wallet registration",
                ));
            }
            _ => {}
        }

        let wallet_address = match wallet_address {
            Some(address) if !is_valid_wallet_address(address.trim()) => {
                return Err(AuthError::bad_request("Invalid wallet address"));
            }
            Some(address) => Some(address.trim().to_lowercase()),
            None => None,
        };
        let password_hash = password.as_deref().map(hash_password).transpose()?;

        let user = User {
            email: email.clone(),
            auth_type,
            wallet_address,
            email_verified: auth_type == AuthType::Wallet,
            password_hash,
            created_at: Utc::now(),
            last_login: None,
        };
        if !self.users.insert_new(email.clone(), user.clone()) {
            return Err(AuthError::UserExists);
        }
        tracing::info!(email = %email, auth_type = ?auth_type, "User registered");

        if auth_type == AuthType::Wallet {
            match self.mailer.register_email(&email).await {
                Ok(tx_hash) => tracing::info!(email = %email, tx_hash = %tx_hash, "Email registered on-chain"),
                Err(e) => tracing::warn!(email = %email, error = %e, "On-chain email registration failed"),
            }
        }

        Ok(AuthResponse {
            token: self.sessions.create(&email),
            user: UserResponse::from(&user),
        })
    }

    pub async fn login(&self, data: LoginData) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&data.email);
        let Some(auth_type) = data.auth_type.filter(|_| !email.is_empty()) else {
            return Err(AuthError::bad_request("Email and authType are required"));
        };
        let user = self.users.get(&email).ok_or(AuthError::InvalidCredentials)?;

        match auth_type {
            AuthType::Traditional => {
                let password = data
                    .password
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| AuthError::bad_request("Password is required"))?;
                let valid = user
                    .password_hash
                    .as_deref()
                    .is_some_and(|hash| verify_password(&password, hash));
                if !valid {
                    tracing::info!(email = %email, "Password login rejected");
                    return Err(AuthError::InvalidCredentials);
                }
            }
            AuthType::Wallet => {
                let signature = data
                    .signature
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| AuthError::bad_request("Signature is required for wallet login"))?;
                let linked = user
                    .wallet_address
                    .as_deref()
                    .ok_or_else(|| AuthError::bad_request("No wallet linked to this account"))?;
                self.verify_challenge_signature(&email, linked, &signature)?;
            }
        }

        let now = Utc::now();
        let user = match self.users.get_mut(&email) {
            Some(mut stored) => {
                stored.last_login = Some(now);
                stored.clone()
            }
            None => return Err(AuthError::InvalidCredentials),
        };
        tracing::info!(email = %email, auth_type = ?auth_type, "User logged in");

        Ok(AuthResponse {
            token: self.sessions.create(&email),
            user: UserResponse::from(&user),
        })
    }

    /// Check `signature` against the outstanding nonce for `email` and
    /// consume the nonce when it recovers to `expected`.
    fn verify_challenge_signature(&self, email: &str, expected: &str, signature: &str) -> Result<(), AuthError> {
        let key = email.to_string();
        let challenge = self.challenges.get(&key).ok_or(AuthError::ChallengeExpired)?;
        if challenge.expires_at <= Utc::now() {
            self.challenges.remove(&key);
            return Err(AuthError::ChallengeExpired);
        }

        let recovered = recover_signer(&challenge.nonce, signature).map_err(|e| {
            tracing::info!(email = %email, error = %e, "Unreadable wallet signature");
            AuthError::InvalidSignature
        })?;
        if !recovered.to_string().eq_ignore_ascii_case(expected) {
            tracing::info!(email = %email, recovered = %recovered, "Signature from unexpected wallet");
            return Err(AuthError::InvalidSignature);
        }

        self.challenges.remove(&key);
        Ok(())
    }

    /// Email of the user behind a bearer token.
    pub fn authenticate(&self, token: &str) -> Result<String, AuthError> {
        let email = self.sessions.resolve(token).ok_or(AuthError::InvalidSession)?;
        if !self.users.contains(&email) {
            self.sessions.revoke(token);
            return Err(AuthError::InvalidSession);
        }
        Ok(email)
    }

    pub fn profile(&self, token: &str) -> Result<UserResponse, AuthError> {
        let email = self.authenticate(token)?;
        self.users
            .get(&email)
            .map(|user| UserResponse::from(&user))
            .ok_or(AuthError::InvalidSession)
    }

    pub fn update_profile(&self, token: &str, data: UpdateProfileData) -> Result<UserResponse, AuthError> {
        let email = self.authenticate(token)?;
        let wallet_address = match data.wallet_address {
            Some(address) if !is_valid_wallet_address(address.trim()) => {
                return Err(AuthError::bad_request("Invalid wallet address"));
            }
            other => other.map(|a| a.trim().to_lowercase()),
        };

        let mut user = self.users.get_mut(&email).ok_or(AuthError::InvalidSession)?;
        if wallet_address.is_some() {
            user.wallet_address = wallet_address;
        }
        Ok(UserResponse::from(&*user))
    }

    /// Link a wallet after proving control of it with a signed challenge.
    pub fn link_wallet(&self, token: &str, data: LinkWalletData) -> Result<UserResponse, AuthError> {
        let email = self.authenticate(token)?;
        let address = data.wallet_address.trim();
        if !is_valid_wallet_address(address) {
            return Err(AuthError::bad_request("Invalid wallet address"));
        }
        self.verify_challenge_signature(&email, address, &data.signature)?;

        let mut user = self.users.get_mut(&email).ok_or(AuthError::InvalidSession)?;
        user.wallet_address = Some(address.to_lowercase());
        tracing::info!(email = %email, wallet = %address, "Wallet linked");
        Ok(UserResponse::from(&*user))
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.users.save()?;
        self.sessions.save()
    }
}
