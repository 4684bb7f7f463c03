//! Relayer wallet and signature recovery.
//!
//! # Security
//! - The relayer key is loaded ONLY from the environment
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::RELAYER_KEY_ENV_VAR;

/// The service's own signing key, used to pay for contract writes.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// Accepts the key with or without a `0x` prefix.
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let signer = signer.with_chain_id(Some(chain_id));

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Relayer wallet initialized"
        );

        Ok(Self { signer, chain_id })
    }

    /// Load the relayer wallet from `DEXMAIL_RELAYER_PRIVATE_KEY`.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        let private_key = crate::config::secret_from_env(RELAYER_KEY_ENV_VAR).ok_or_else(|| {
            BlockchainError::Wallet(format!("Environment variable {} not set", RELAYER_KEY_ENV_VAR))
        })?;

        Self::from_private_key(&private_key, chain_id)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Network wallet for a signing provider.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    /// Sign arbitrary message bytes (with Ethereum prefix).
    pub async fn sign_message(&self, message: &[u8]) -> BlockchainResult<Signature> {
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Message signing failed: {}", e)))
    }
}

/// Recover the address that produced an EIP-191 `personal_sign` signature.
pub fn recover_signer(message: &str, signature_hex: &str) -> BlockchainResult<Address> {
    let raw = signature_hex.trim();
    let bytes = alloy::hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
        .map_err(|e| BlockchainError::Wallet(format!("Signature is not hex: {}", e)))?;
    let signature = Signature::try_from(bytes.as_slice())
        .map_err(|e| BlockchainError::Wallet(format!("Malformed signature: {}", e)))?;

    signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| BlockchainError::Wallet(format!("Signature recovery failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 84532).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
        assert_eq!(wallet.chain_id(), 84532);
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = Wallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), 1).unwrap();
        assert_eq!(wallet.address().to_string().to_lowercase(), TEST_ADDRESS);
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key", 1);
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_sign_and_recover() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        let message = "Sign this message to authenticate with DexMail: 1700000000000";
        let signature = wallet.sign_message(message.as_bytes()).await.unwrap();
        let hex_sig = format!("0x{}", alloy::hex::encode(signature.as_bytes()));

        let recovered = recover_signer(message, &hex_sig).unwrap();
        assert_eq!(recovered, wallet.address());

        let other = recover_signer("a different message", &hex_sig).unwrap();
        assert_ne!(other, wallet.address());
    }

    #[test]
    fn test_recover_rejects_garbage() {
        assert!(recover_signer("hello", "0xzz").is_err());
        assert!(recover_signer("hello", "0x1234").is_err());
    }
}
