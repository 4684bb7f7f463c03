//! Mapping from subsystem errors to HTTP responses.
//!
//! Every handler returns `Result<_, ApiError>`. The body is always
//! `{"error": "...", "details"?: "..."}`. Server-side failures are logged
//! here so handlers do not have to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::blockchain::BlockchainError;
use crate::claim::ClaimError;
use crate::ipfs::IpfsError;
use crate::mail::MailError;
use crate::relay::RelayError;
use crate::wallets::WalletError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn unauthorized(error: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error)
    }

    pub fn forbidden(error: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").with_details(details)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                error = %self.error,
                details = self.details.as_deref().unwrap_or(""),
                "Request failed"
            );
        } else {
            tracing::debug!(status = self.status.as_u16(), error = %self.error, "Request rejected");
        }
        let body = ErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::BadRequest(_) | AuthError::UserExists => ApiError::bad_request(e.to_string()),
            AuthError::InvalidCredentials
            | AuthError::InvalidSignature
            | AuthError::ChallengeExpired
            | AuthError::InvalidSession => ApiError::unauthorized(e.to_string()),
            AuthError::Hashing(details) => ApiError::internal(details),
        }
    }
}

impl From<BlockchainError> for ApiError {
    fn from(e: BlockchainError) -> Self {
        let status = match &e {
            BlockchainError::NotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BlockchainError::Reverted(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BlockchainError::Wallet(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, "Blockchain request failed").with_details(e.to_string())
    }
}

impl From<IpfsError> for ApiError {
    fn from(e: IpfsError) -> Self {
        let status = match &e {
            IpfsError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, "IPFS request failed").with_details(e.to_string())
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::InvalidSender(_) | MailError::InvalidRecipient(_) => {
                ApiError::bad_request(e.to_string())
            }
            MailError::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, e.to_string()),
            MailError::Upload(inner) => {
                let mut err = ApiError::from(inner);
                err.error = "Failed to upload email to IPFS".to_string();
                err
            }
            MailError::Chain(inner) => ApiError::from(inner),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::InvalidEmail(_) | WalletError::InvalidOwner(_) => {
                ApiError::bad_request(e.to_string())
            }
            WalletError::Chain(inner) => ApiError::from(inner),
        }
    }
}

impl From<ClaimError> for ApiError {
    fn from(e: ClaimError) -> Self {
        if let ClaimError::Wallet(inner) = e {
            return ApiError::from(inner);
        }
        let status = match &e {
            ClaimError::InvalidToken | ClaimError::NotVerified | ClaimError::InvalidCode => {
                StatusCode::BAD_REQUEST
            }
            ClaimError::NotFound => StatusCode::NOT_FOUND,
            ClaimError::Expired => StatusCode::GONE,
            ClaimError::AlreadyClaimed | ClaimError::InProgress => StatusCode::CONFLICT,
            ClaimError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            ClaimError::Wallet(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::MissingFields | RelayError::InvalidSubject => {
                ApiError::bad_request(e.to_string())
            }
            RelayError::NotConfigured => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            RelayError::Upstream { ref details, .. } => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).with_details(details.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_statuses() {
        assert_eq!(ApiError::from(AuthError::UserExists).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(AuthError::InvalidSession).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::Hashing("salt".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_claim_statuses() {
        assert_eq!(ApiError::from(ClaimError::Expired).status(), StatusCode::GONE);
        assert_eq!(ApiError::from(ClaimError::AlreadyClaimed).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(ClaimError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(ClaimError::InProgress).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(ClaimError::TooManyAttempts).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        let reverted = ClaimError::Wallet(WalletError::Chain(BlockchainError::Reverted("taken".into())));
        assert_eq!(ApiError::from(reverted).status(), StatusCode::UNPROCESSABLE_ENTITY);
        let chain = ClaimError::Wallet(WalletError::Chain(BlockchainError::Timeout(10)));
        assert_eq!(ApiError::from(chain).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_mail_upload_keeps_message() {
        let err = ApiError::from(MailError::Upload(IpfsError::NotConfigured));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to upload email to IPFS");
    }

    #[test]
    fn test_relay_statuses() {
        assert_eq!(ApiError::from(RelayError::MissingFields).status(), StatusCode::BAD_REQUEST);
        let err = ApiError::from(RelayError::Upstream {
            status: Some(401),
            details: "bad key".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to send email");
        assert_eq!(err.details.as_deref(), Some("bad key"));
    }

    #[test]
    fn test_disabled_chain_is_unavailable() {
        let err = ApiError::from(BlockchainError::NotAvailable("off".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
