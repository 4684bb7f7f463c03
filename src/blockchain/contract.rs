//! Mailer contract bindings.
//!
//! The contract is an external collaborator: this module only knows its
//! read/write interface. Services talk to it through the [`Mailer`] trait so
//! they can run against a fake in tests or against [`UnavailableMailer`]
//! when the chain integration is switched off.

use std::sync::Arc;
use alloy::primitives::{Address, Bytes, TxHash, B256};
use alloy::sol;
use async_trait::async_trait;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::transaction::wait_for_confirmation;
use crate::blockchain::types::{
    u256_to_u64, BlockchainError, BlockchainResult, ConfirmationStatus, IndexedMail,
};
use crate::observability::metrics;

sol! {
    #[sol(rpc)]
    interface BaseMailer {
        struct Mail {
            address sender;
            string recipientEmail;
            bytes32 cid;
            uint256 timestamp;
            bool isExternal;
            bool hasCrypto;
        }

        function registerEmail(string email) external;
        function indexMail(string recipientEmail, bytes32 cid, bool isExternal, bool hasCrypto) external returns (uint256);
        function getInbox(string email) external view returns (uint256[] memory);
        function getMail(uint256 mailId) external view returns (Mail memory);
        function claimWallet(string email, address claimantOwner, bytes verificationProof) external returns (address);
        function computeWalletAddress(string email) external view returns (address);
        function computeWalletHash(string email) external pure returns (bytes32);
        function isWalletDeployed(address wallet) external view returns (bool);
        function getEmailOwner(string email) external view returns (address);
        function getWalletAddress(bytes32 emailHash) external view returns (address);
    }
}

/// Everything the service needs from the mailer contract.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Index a message for `recipient`. Returns the transaction hash.
    async fn index_mail(
        &self,
        recipient: &str,
        cid_hash: B256,
        is_external: bool,
        has_crypto: bool,
    ) -> BlockchainResult<TxHash>;

    /// Ids of every message indexed for `email`, oldest first.
    async fn inbox_ids(&self, email: &str) -> BlockchainResult<Vec<u64>>;

    async fn mail(&self, id: u64) -> BlockchainResult<IndexedMail>;

    async fn register_email(&self, email: &str) -> BlockchainResult<TxHash>;

    async fn claim_wallet(&self, email: &str, owner: Address, proof: Bytes) -> BlockchainResult<TxHash>;

    async fn compute_wallet_address(&self, email: &str) -> BlockchainResult<Address>;

    async fn compute_wallet_hash(&self, email: &str) -> BlockchainResult<B256>;

    async fn is_wallet_deployed(&self, wallet: Address) -> BlockchainResult<bool>;

    async fn email_owner(&self, email: &str) -> BlockchainResult<Address>;

    async fn wallet_address(&self, email_hash: B256) -> BlockchainResult<Address>;
}

/// [`Mailer`] backed by the deployed contract.
#[derive(Debug, Clone)]
pub struct OnChainMailer {
    client: BlockchainClient,
    address: Address,
}

impl OnChainMailer {
    pub fn new(client: BlockchainClient, address: Address) -> Self {
        tracing::info!(contract = %address, "Mailer contract bound");
        Self { client, address }
    }

    pub fn client(&self) -> &BlockchainClient {
        &self.client
    }

    /// Send a prepared write and wait for it to confirm.
    async fn confirm(&self, call: &'static str, tx_hash: TxHash) -> BlockchainResult<TxHash> {
        let timeout_secs = self.client.config().confirmation_timeout_secs;
        match wait_for_confirmation(&self.client, tx_hash, timeout_secs).await? {
            ConfirmationStatus::Confirmed { block_number } => {
                tracing::info!(call, tx_hash = %tx_hash, block_number, "Transaction confirmed");
                metrics::record_chain_call(call, true);
                Ok(tx_hash)
            }
            ConfirmationStatus::Failed(reason) => {
                metrics::record_chain_call(call, false);
                Err(BlockchainError::Reverted(reason))
            }
            other => Err(BlockchainError::Rpc(format!("unexpected status {:?}", other))),
        }
    }
}

/// JSON-RPC code 3 is the node's "execution reverted" answer to
/// `eth_estimateGas` and `eth_call`.
fn is_revert_response(code: i64, message: &str) -> bool {
    code == 3 || message.to_ascii_lowercase().contains("execution reverted")
}

/// Why the contract refused a write, if it did.
fn revert_reason(e: &alloy::contract::Error) -> Option<String> {
    if let Some(data) = e.as_revert_data() {
        return Some(format!("revert data {data}"));
    }
    let alloy::contract::Error::TransportError(transport) = e else {
        return None;
    };
    let resp = transport.as_error_resp()?;
    is_revert_response(resp.code, &resp.message).then(|| resp.message.to_string())
}

/// Reverts, usually caught while estimating gas, are final. Anything
/// else is a transport problem worth retrying.
fn send_error(call: &'static str, e: alloy::contract::Error) -> BlockchainError {
    metrics::record_chain_call(call, false);
    match revert_reason(&e) {
        Some(reason) => {
            tracing::warn!(call, reason = %reason, "Contract write reverted");
            BlockchainError::Reverted(format!("{call}: {reason}"))
        }
        None => {
            tracing::warn!(call, error = %e, "Contract write rejected");
            BlockchainError::Rpc(format!("{} failed: {}", call, e))
        }
    }
}

#[async_trait]
impl Mailer for OnChainMailer {
    async fn index_mail(
        &self,
        recipient: &str,
        cid_hash: B256,
        is_external: bool,
        has_crypto: bool,
    ) -> BlockchainResult<TxHash> {
        let contract = BaseMailer::new(self.address, self.client.signer()?);
        let pending = contract
            .indexMail(recipient.to_string(), cid_hash, is_external, has_crypto)
            .send()
            .await
            .map_err(|e| send_error("indexMail", e))?;
        self.confirm("indexMail", *pending.tx_hash()).await
    }

    async fn inbox_ids(&self, email: &str) -> BlockchainResult<Vec<u64>> {
        let address = self.address;
        let ids = self
            .client
            .read("getInbox", |p| {
                let email = email.to_string();
                async move { BaseMailer::new(address, p).getInbox(email).call().await }
            })
            .await?;
        ids.into_iter().map(|id| u256_to_u64(id, "mail id")).collect()
    }

    async fn mail(&self, id: u64) -> BlockchainResult<IndexedMail> {
        let address = self.address;
        let mail = self
            .client
            .read("getMail", |p| async move {
                BaseMailer::new(address, p)
                    .getMail(alloy::primitives::U256::from(id))
                    .call()
                    .await
            })
            .await?;

        Ok(IndexedMail {
            id,
            sender: mail.sender,
            recipient_email: mail.recipientEmail,
            cid_hash: mail.cid,
            timestamp: u256_to_u64(mail.timestamp, "timestamp")?,
            is_external: mail.isExternal,
            has_crypto: mail.hasCrypto,
        })
    }

    async fn register_email(&self, email: &str) -> BlockchainResult<TxHash> {
        let contract = BaseMailer::new(self.address, self.client.signer()?);
        let pending = contract
            .registerEmail(email.to_string())
            .send()
            .await
            .map_err(|e| send_error("registerEmail", e))?;
        self.confirm("registerEmail", *pending.tx_hash()).await
    }

    async fn claim_wallet(&self, email: &str, owner: Address, proof: Bytes) -> BlockchainResult<TxHash> {
        let contract = BaseMailer::new(self.address, self.client.signer()?);
        let pending = contract
            .claimWallet(email.to_string(), owner, proof)
            .send()
            .await
            .map_err(|e| send_error("claimWallet", e))?;
        self.confirm("claimWallet", *pending.tx_hash()).await
    }

    async fn compute_wallet_address(&self, email: &str) -> BlockchainResult<Address> {
        let address = self.address;
        self.client
            .read("computeWalletAddress", |p| {
                let email = email.to_string();
                async move { BaseMailer::new(address, p).computeWalletAddress(email).call().await }
            })
            .await
    }

    async fn compute_wallet_hash(&self, email: &str) -> BlockchainResult<B256> {
        let address = self.address;
        self.client
            .read("computeWalletHash", |p| {
                let email = email.to_string();
                async move { BaseMailer::new(address, p).computeWalletHash(email).call().await }
            })
            .await
    }

    async fn is_wallet_deployed(&self, wallet: Address) -> BlockchainResult<bool> {
        let address = self.address;
        self.client
            .read("isWalletDeployed", |p| async move {
                BaseMailer::new(address, p).isWalletDeployed(wallet).call().await
            })
            .await
    }

    async fn email_owner(&self, email: &str) -> BlockchainResult<Address> {
        let address = self.address;
        self.client
            .read("getEmailOwner", |p| {
                let email = email.to_string();
                async move { BaseMailer::new(address, p).getEmailOwner(email).call().await }
            })
            .await
    }

    async fn wallet_address(&self, email_hash: B256) -> BlockchainResult<Address> {
        let address = self.address;
        self.client
            .read("getWalletAddress", |p| async move {
                BaseMailer::new(address, p).getWalletAddress(email_hash).call().await
            })
            .await
    }
}

/// [`Mailer`] used when the chain integration is disabled.
///
/// Every call fails with `NotAvailable`, which callers treat the same as
/// an unreachable RPC.
#[derive(Debug, Clone, Default)]
pub struct UnavailableMailer;

impl UnavailableMailer {
    fn err<T>(&self) -> BlockchainResult<T> {
        Err(BlockchainError::NotAvailable("blockchain integration disabled".to_string()))
    }
}

#[async_trait]
impl Mailer for UnavailableMailer {
    async fn index_mail(&self, _: &str, _: B256, _: bool, _: bool) -> BlockchainResult<TxHash> {
        self.err()
    }
    async fn inbox_ids(&self, _: &str) -> BlockchainResult<Vec<u64>> {
        self.err()
    }
    async fn mail(&self, _: u64) -> BlockchainResult<IndexedMail> {
        self.err()
    }
    async fn register_email(&self, _: &str) -> BlockchainResult<TxHash> {
        self.err()
    }
    async fn claim_wallet(&self, _: &str, _: Address, _: Bytes) -> BlockchainResult<TxHash> {
        self.err()
    }
    async fn compute_wallet_address(&self, _: &str) -> BlockchainResult<Address> {
        self.err()
    }
    async fn compute_wallet_hash(&self, _: &str) -> BlockchainResult<B256> {
        self.err()
    }
    async fn is_wallet_deployed(&self, _: Address) -> BlockchainResult<bool> {
        self.err()
    }
    async fn email_owner(&self, _: &str) -> BlockchainResult<Address> {
        self.err()
    }
    async fn wallet_address(&self, _: B256) -> BlockchainResult<Address> {
        self.err()
    }
}

/// Shared handle to whichever mailer is active.
pub type SharedMailer = Arc<dyn Mailer>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_mailer() {
        let mailer = UnavailableMailer;
        let err = mailer.inbox_ids("alice@dexmail.app").await.unwrap_err();
        assert!(matches!(err, BlockchainError::NotAvailable(_)));
        assert!(!err.is_transient());
    }

    fn rpc_error(code: i64, message: &'static str) -> alloy::contract::Error {
        alloy::contract::Error::TransportError(alloy::transports::RpcError::ErrorResp(
            alloy::rpc::json_rpc::ErrorPayload {
                code,
                message: message.into(),
                data: None,
            },
        ))
    }

    #[test]
    fn test_estimate_gas_revert_is_final() {
        let err = send_error("claimWallet", rpc_error(3, "execution reverted: wallet already claimed"));
        assert!(matches!(&err, BlockchainError::Reverted(reason) if reason.contains("already claimed")));
        assert!(!err.is_transient());

        let err = send_error("claimWallet", rpc_error(-32000, "Execution reverted"));
        assert!(matches!(err, BlockchainError::Reverted(_)));
    }

    #[test]
    fn test_node_failure_stays_transient() {
        let err = send_error("indexMail", rpc_error(-32000, "nonce too low"));
        assert!(matches!(err, BlockchainError::Rpc(_)));
        assert!(err.is_transient());

        let err = send_error(
            "indexMail",
            alloy::contract::Error::TransportError(alloy::transports::TransportErrorKind::backend_gone()),
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_index_mail_calldata() {
        use alloy::sol_types::SolCall;

        let call = BaseMailer::indexMailCall {
            recipientEmail: "bob@dexmail.app".to_string(),
            cid: B256::repeat_byte(0xab),
            isExternal: false,
            hasCrypto: true,
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], BaseMailer::indexMailCall::SELECTOR.as_slice());
        let decoded = BaseMailer::indexMailCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.recipientEmail, "bob@dexmail.app");
        assert!(decoded.hasCrypto);
    }
}
