//! Transaction confirmation monitoring.

use std::time::Duration;
use alloy::primitives::TxHash;
use tokio::time::{interval, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus};

/// Wait until `tx_hash` is buried under the configured number of blocks.
///
/// Returns `Failed` for a reverted transaction and
/// `ConfirmationTimeout` when the deadline passes first.
pub async fn wait_for_confirmation(
    client: &BlockchainClient,
    tx_hash: TxHash,
    timeout_secs: u64,
) -> BlockchainResult<ConfirmationStatus> {
    let required_confirmations = client.confirmation_blocks();
    let poll_interval = Duration::from_secs(2);

    let result = timeout(Duration::from_secs(timeout_secs), async {
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;

            let receipt = match client.get_transaction_receipt(tx_hash).await? {
                Some(r) => r,
                None => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
            };

            if !receipt.status() {
                return Ok(ConfirmationStatus::Failed("Transaction reverted".to_string()));
            }

            let current_block = client.get_block_number().await?;
            let tx_block = receipt.block_number.unwrap_or(current_block);
            let status = confirmation_status(current_block, tx_block, required_confirmations);
            if let ConfirmationStatus::Confirmed { .. } = status {
                return Ok(status);
            }

            tracing::debug!(tx_hash = %tx_hash, status = ?status, "Waiting for confirmations");
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(_) => Err(BlockchainError::ConfirmationTimeout(required_confirmations)),
    }
}

/// Classify a mined transaction by how deep it is.
///
/// The block containing the transaction counts as the first confirmation.
pub fn confirmation_status(current_block: u64, tx_block: u64, required: u32) -> ConfirmationStatus {
    let confirmations = current_block.saturating_sub(tx_block).saturating_add(1) as u32;
    if confirmations >= required {
        ConfirmationStatus::Confirmed {
            block_number: tx_block,
        }
    } else {
        ConfirmationStatus::Confirming {
            current: confirmations,
            required,
        }
    }
}
