//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem at once instead of stopping at the first.

use std::net::SocketAddr;
use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::DexmailConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &DexmailConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }

    if config.rate_limit.enabled && config.rate_limit.requests_per_second == 0 {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_second",
            "must be greater than 0 when rate limiting is enabled",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    let chain = &config.blockchain;
    if chain.enabled {
        if chain.chain_id == 0 {
            errors.push(ValidationError::new("blockchain.chain_id", "must be greater than 0"));
        }
        if chain.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be greater than 0"));
        }
        if url::Url::parse(&chain.rpc_url).is_err() {
            errors.push(ValidationError::new(
                "blockchain.rpc_url",
                format!("'{}' is not a URL", chain.rpc_url),
            ));
        }
        match chain.contract_address.parse::<Address>() {
            Ok(addr) if addr.is_zero() => {
                errors.push(ValidationError::new("blockchain.contract_address", "zero address"));
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::new(
                "blockchain.contract_address",
                format!("'{}' is not an address", chain.contract_address),
            )),
        }
    }

    for (field, value) in [
        ("ipfs.pinata_api_url", &config.ipfs.pinata_api_url),
        ("ipfs.gateway_url", &config.ipfs.gateway_url),
        ("sendgrid.api_url", &config.sendgrid.api_url),
        ("claim.base_url", &config.claim.base_url),
        ("price.api_url", &config.price.api_url),
        ("nft.api_url", &config.nft.api_url),
    ] {
        if url::Url::parse(value).is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a URL", value)));
        }
    }

    if config.claim.max_code_attempts == 0 {
        errors.push(ValidationError::new("claim.max_code_attempts", "must be greater than 0"));
    }

    if config.claim.ttl_secs == 0 {
        errors.push(ValidationError::new("claim.ttl_secs", "must be greater than 0"));
    }
    if config.auth.session_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.session_ttl_secs", "must be greater than 0"));
    }
    if config.auth.challenge_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.challenge_ttl_secs", "must be greater than 0"));
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&DexmailConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = DexmailConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.timeouts.request_secs = 0;
        config.claim.ttl_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "timeouts.request_secs", "claim.ttl_secs"]
        );
    }

    #[test]
    fn test_chain_requires_contract_address() {
        let mut config = DexmailConfig::default();
        config.blockchain.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "blockchain.contract_address");

        config.blockchain.contract_address =
            "0x0000000000000000000000000000000000000000".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].message, "zero address");
    }
}
