use ethers::prelude::*;
use std::sync::Arc;

use crate::chain::contracts::{KalaMoney, PoolModifyLiquidityTest};
use crate::chain::pool::{PoolKey, DEFAULT_SALT, TICK_LOWER, TICK_UPPER};
use crate::chain::registry::{ContractConfig, Deployment};
use crate::errors::ChainError;

/// Write side: approve KALA to the harness and move liquidity in or out of
/// the full-range position. Every call is split into submit (returns the
/// hash as soon as the node accepts it) and [`LiquidityClient::wait_for_receipt`].
pub struct LiquidityClient<M> {
    client: Arc<M>,
    account: Address,
    token: ContractConfig,
    harness: ContractConfig,
    pool_key: PoolKey,
}

impl<M: Middleware + 'static> LiquidityClient<M> {
    /// `account` is the address `client` sends from.
    pub fn new(client: Arc<M>, account: Address, deployment: &Deployment, pool_key: PoolKey) -> Self {
        Self {
            client,
            account,
            token: deployment.kala_money_config(),
            harness: deployment.modify_liquidity_config(),
            pool_key,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// approve(harness, amount) on the KALA token.
    pub async fn submit_approve(&self, amount: U256) -> Result<H256, ChainError> {
        let token = KalaMoney::new(self.token.address, self.client.clone());
        let call = token.approve(self.harness.address, amount);
        let pending = call.send().await?;
        let tx_hash = pending.tx_hash();
        log::info!(
            "Approve submitted on chain {}: {:?} ({} KALA wei)",
            self.token.chain_id,
            tx_hash,
            amount
        );
        Ok(tx_hash)
    }

    /// modifyLiquidity on the full-range position. A positive `delta` adds
    /// (and carries `value` wei of ETH), a negative one removes.
    pub async fn submit_modify_liquidity(&self, delta: I256, value: U256) -> Result<H256, ChainError> {
        if delta.is_zero() {
            return Err(ChainError::InvalidInput("liquidity delta must be non-zero".to_string()));
        }
        let harness = PoolModifyLiquidityTest::new(self.harness.address, self.client.clone());
        let mut call = harness.modify_liquidity(
            self.pool_key.as_tuple(),
            (TICK_LOWER, TICK_UPPER, delta, DEFAULT_SALT),
            Bytes::new(),
        );
        if !value.is_zero() {
            call = call.value(value);
        }
        let pending = call.send().await?;
        let tx_hash = pending.tx_hash();
        log::info!(
            "modifyLiquidity submitted on chain {}: {:?} (delta {}, value {})",
            self.harness.chain_id,
            tx_hash,
            delta,
            value
        );
        Ok(tx_hash)
    }

    /// Wait for `tx_hash` to be mined and require a success status.
    pub async fn wait_for_receipt(&self, tx_hash: H256) -> Result<TransactionReceipt, ChainError> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .await?
            .ok_or(ChainError::TransactionDropped(tx_hash))?;
        check_receipt(receipt)
    }
}

pub fn check_receipt(receipt: TransactionReceipt) -> Result<TransactionReceipt, ChainError> {
    match receipt.status {
        Some(status) if status == U64::one() => {
            log::info!(
                "Transaction {:?} confirmed in block {:?}",
                receipt.transaction_hash,
                receipt.block_number
            );
            Ok(receipt)
        }
        _ => {
            log::error!("Transaction {:?} reverted", receipt.transaction_hash);
            Err(ChainError::TransactionReverted(receipt.transaction_hash))
        }
    }
}
