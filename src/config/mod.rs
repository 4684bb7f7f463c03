//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)            environment
//!     → loader.rs (parse)         DEXMAIL_RELAYER_PRIVATE_KEY
//!     → validation.rs (semantic)  DEXMAIL_PINATA_JWT
//!     → DexmailConfig             DEXMAIL_SENDGRID_API_KEY
//!     → shared via Arc            DEXMAIL_NFT_API_KEY
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Secrets never live in the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, BlockchainConfig, ClaimConfig, DexmailConfig, IpfsConfig, NftConfig,
    ObservabilityConfig, PriceConfig, RateLimitConfig, RetryConfig, SendGridConfig,
    SecurityConfig, StorageConfig,
};
pub use validation::{validate_config, ValidationError};

/// Environment variable holding the relayer private key.
pub const RELAYER_KEY_ENV_VAR: &str = "DEXMAIL_RELAYER_PRIVATE_KEY";

/// Environment variable holding the Pinata JWT.
pub const PINATA_JWT_ENV_VAR: &str = "DEXMAIL_PINATA_JWT";

/// Environment variable holding the SendGrid API key.
pub const SENDGRID_KEY_ENV_VAR: &str = "DEXMAIL_SENDGRID_API_KEY";

/// Environment variable holding the NFT API key.
pub const NFT_KEY_ENV_VAR: &str = "DEXMAIL_NFT_API_KEY";

/// Read a non-empty secret from the environment.
pub fn secret_from_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
