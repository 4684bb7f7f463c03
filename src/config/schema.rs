//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mail
//! service. All types derive Serde traits for deserialization from config
//! files. Secrets (relayer key, Pinata JWT, SendGrid key) are never part of
//! the file; they are read from the environment at startup.

use serde::{Deserialize, Serialize};

/// Root configuration for the DexMail service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DexmailConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting for authentication endpoints.
    pub rate_limit: RateLimitConfig,

    /// Retry configuration for claim deployment.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Blockchain integration settings.
    pub blockchain: BlockchainConfig,

    /// IPFS pinning and gateway settings.
    pub ipfs: IpfsConfig,

    /// Outbound email relay.
    pub sendgrid: SendGridConfig,

    /// Session and challenge lifetimes.
    pub auth: AuthConfig,

    /// Claim token settings.
    pub claim: ClaimConfig,

    /// ETH price lookup.
    pub price: PriceConfig,

    /// NFT lookup.
    pub nft: NftConfig,

    /// Local persistence.
    pub storage: StorageConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout for calls to external HTTP APIs (IPFS, SendGrid, prices).
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 5,
            burst_size: 20,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts for wallet deployment during a claim.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Enable blockchain integration.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (8453 for Base, 84532 for Base Sepolia, 31337 for Anvil).
    pub chain_id: u64,

    /// Address of the mailer contract.
    pub contract_address: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required for finality.
    pub confirmation_blocks: u32,

    /// How long to wait for a write to confirm, in seconds.
    pub confirmation_timeout_secs: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 84532,
            contract_address: String::new(),
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 60,
        }
    }
}

/// IPFS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// Pinata API base URL.
    pub pinata_api_url: String,

    /// Gateway used to read pinned content back.
    pub gateway_url: String,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            pinata_api_url: "https://api.pinata.cloud".to_string(),
            gateway_url: "https://gateway.pinata.cloud".to_string(),
        }
    }
}

/// SendGrid relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SendGridConfig {
    /// SendGrid v3 API base URL.
    pub api_url: String,
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.sendgrid.com".to_string(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Wallet challenge lifetime in seconds.
    pub challenge_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 7 * 24 * 3600,
            challenge_ttl_secs: 3600,
        }
    }
}

/// Claim token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Claim lifetime in seconds.
    pub ttl_secs: u64,

    /// Public base URL used to build claim links.
    pub base_url: String,

    /// Remaining lifetime under which a claim counts as expiring soon.
    pub expiring_soon_secs: u64,

    /// Wrong codes accepted per claim before it locks.
    pub max_code_attempts: u32,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 3600,
            base_url: "http://localhost:3000".to_string(),
            expiring_soon_secs: 24 * 3600,
            max_code_attempts: 5,
        }
    }
}

/// ETH price lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceConfig {
    /// CoinGecko API base URL.
    pub api_url: String,

    /// How long a fetched price stays fresh, in seconds.
    pub cache_secs: u64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.coingecko.com/api/v3".to_string(),
            cache_secs: 300,
        }
    }
}

/// NFT lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NftConfig {
    /// NFT API base URL.
    pub api_url: String,

    /// Chain slug used in NFT API paths.
    pub chain: String,
}

impl Default for NftConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.opensea.io/api/v2".to_string(),
            chain: "base".to_string(),
        }
    }
}

/// Local persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for JSON snapshots. None keeps everything in memory.
    pub data_dir: Option<String>,

    /// Seconds between background snapshots of every store. 0 disables.
    pub flush_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            flush_interval_secs: 30,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
