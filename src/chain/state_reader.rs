use chrono::Utc;
use ethers::contract::Multicall;
use ethers::prelude::*;
use futures::{stream, StreamExt};
use std::sync::Arc;

use crate::chain::contracts::{KalaHook, KalaMoney, PriceFeed, StateView};
use crate::chain::pool::{PoolId, PoolKey, DEFAULT_SALT, TICK_LOWER, TICK_UPPER};
use crate::chain::registry::Deployment;
use crate::errors::ChainError;
use crate::models::{
    AccountSnapshot, HookConfig, OraclePrices, PoolSnapshot, PositionInfo, PositionOwner,
    PositionPool, PositionReading, PositionSource, Slot0,
};

/// Concurrent position lookups per account refresh.
const POSITION_LOOKUP_PARALLELISM: usize = 4;

/// Everything the read side needs to locate state on chain.
#[derive(Debug, Clone)]
pub struct ReadTargets {
    pub deployment: Deployment,
    pub pool_key: PoolKey,
    pub legacy_pool_key: Option<PoolKey>,
    pub position_sources: Vec<PositionSource>,
    pub multicall: Option<Address>,
}

impl ReadTargets {
    /// (pool id, owner) for `source`, or `None` when it cannot apply
    /// (legacy pool not configured).
    pub fn resolve(&self, source: &PositionSource, account: Address) -> Option<(PoolId, Address)> {
        let owner = match source.owner {
            PositionOwner::Harness => self.deployment.pool_modify_liquidity_test,
            PositionOwner::Account => account,
            PositionOwner::Fixed(addr) => addr,
        };
        let pool_id = match source.pool {
            PositionPool::Current => self.pool_key.pool_id(),
            PositionPool::Legacy => self.legacy_pool_key?.pool_id(),
        };
        Some((pool_id, owner))
    }
}

pub struct StateReader<M> {
    client: Arc<M>,
    targets: ReadTargets,
}

impl<M: Middleware + 'static> StateReader<M> {
    pub fn new(client: Arc<M>, targets: ReadTargets) -> Self {
        Self { client, targets }
    }

    pub fn targets(&self) -> &ReadTargets {
        &self.targets
    }

    /// slot0 + liquidity in one multicall.
    pub async fn fetch_pool_core(&self, pool_id: PoolId) -> Result<(Slot0, u128), ChainError> {
        let view = StateView::new(self.targets.deployment.state_view_config().address, self.client.clone());
        let mut mc = Multicall::new(self.client.clone(), self.targets.multicall).await?;
        mc.add_call(view.get_slot_0(pool_id), false);
        mc.add_call(view.get_liquidity(pool_id), false);
        let ((sqrt_price_x96, tick, protocol_fee, lp_fee), liquidity): ((U256, i32, u32, u32), u128) =
            mc.call().await?;

        log::debug!("slot0: tick: {}, sqrtPriceX96: {}, liquidity: {}", tick, sqrt_price_x96, liquidity);
        Ok((Slot0 { sqrt_price_x96, tick, protocol_fee, lp_fee }, liquidity))
    }

    pub async fn fetch_hook_config(&self) -> Result<HookConfig, ChainError> {
        let hook = KalaHook::new(self.targets.deployment.kala_hook_config().address, self.client.clone());
        let mut mc = Multicall::new(self.client.clone(), self.targets.multicall).await?;
        mc.add_call(hook.kala_oracle(), false);
        mc.add_call(hook.eth_usd_feed(), false);
        mc.add_call(hook.kala_token(), false);
        let (kala_oracle, eth_usd_feed, kala_token): (Address, Address, Address) = mc.call().await?;
        Ok(HookConfig { kala_oracle, eth_usd_feed, kala_token })
    }

    /// Latest answer of an AggregatorV3-style feed, scaled to 18 decimals.
    pub async fn fetch_feed_price(&self, feed: Address) -> Result<U256, ChainError> {
        let feed_contract = PriceFeed::new(feed, self.client.clone());
        let decimals = feed_contract.decimals().call().await?;
        let (_, answer, _, _, _) = feed_contract.latest_round_data().call().await?;
        normalize_feed_answer(answer, decimals)
    }

    /// Both oracle prices; a feed that cannot be read is reported as `None`.
    pub async fn fetch_prices(&self, hook: Option<&HookConfig>) -> OraclePrices {
        let Some(hook) = hook else {
            return OraclePrices::default();
        };
        let (kala, eth) = futures::join!(
            self.optional_price(hook.kala_oracle, "KALA/USD"),
            self.optional_price(hook.eth_usd_feed, "ETH/USD"),
        );
        OraclePrices { kala_usd: kala, eth_usd: eth }
    }

    async fn optional_price(&self, feed: Address, label: &str) -> Option<U256> {
        if feed.is_zero() {
            log::warn!("{} feed not configured on hook", label);
            return None;
        }
        match self.fetch_feed_price(feed).await {
            Ok(price) => Some(price),
            Err(e) => {
                log::warn!("{} feed {:?} unreadable: {}", label, feed, e);
                None
            }
        }
    }

    /// Pool state, hook configuration and oracle prices. Only the pool core
    /// read is fatal; the rest degrade to defaults.
    pub async fn fetch_pool_snapshot(&self) -> Result<PoolSnapshot, ChainError> {
        let (slot0, liquidity) = self.fetch_pool_core(self.targets.pool_key.pool_id()).await?;
        let hook = match self.fetch_hook_config().await {
            Ok(h) => Some(h),
            Err(e) => {
                log::warn!("Hook config unavailable: {}", e);
                None
            }
        };
        let prices = self.fetch_prices(hook.as_ref()).await;
        Ok(PoolSnapshot { slot0, liquidity, hook, prices, fetched_at: Utc::now() })
    }

    pub async fn fetch_position(&self, pool_id: PoolId, owner: Address) -> Result<PositionInfo, ChainError> {
        let view = StateView::new(self.targets.deployment.state_view_config().address, self.client.clone());
        let (liquidity, fee_growth_inside0_last_x128, fee_growth_inside1_last_x128) = view
            .get_position_info(pool_id, owner, TICK_LOWER, TICK_UPPER, DEFAULT_SALT)
            .call()
            .await?;
        Ok(PositionInfo { liquidity, fee_growth_inside0_last_x128, fee_growth_inside1_last_x128 })
    }

    /// One reading per applicable position source, in configured order.
    /// A source that fails to read counts as zero liquidity.
    pub async fn fetch_positions(&self, account: Address) -> Vec<PositionReading> {
        let lookups: Vec<(PositionSource, PoolId, Address)> = self
            .targets
            .position_sources
            .iter()
            .filter_map(|source| {
                self.targets
                    .resolve(source, account)
                    .map(|(pool_id, owner)| (*source, pool_id, owner))
            })
            .collect();

        stream::iter(lookups)
            .map(|(source, pool_id, owner)| async move {
                let liquidity = match self.fetch_position(pool_id, owner).await {
                    Ok(info) => info.liquidity,
                    Err(e) => {
                        log::warn!("Position lookup via {} failed: {}", source, e);
                        0
                    }
                };
                PositionReading { source, liquidity }
            })
            .buffered(POSITION_LOOKUP_PARALLELISM)
            .collect()
            .await
    }

    /// ETH balance, KALA balance, KALA allowance to the harness and summed
    /// position liquidity for `account`.
    pub async fn fetch_account_snapshot(&self, account: Address) -> Result<AccountSnapshot, ChainError> {
        let token = KalaMoney::new(self.targets.deployment.kala_money_config().address, self.client.clone());
        let harness = self.targets.deployment.modify_liquidity_config().address;

        let eth_balance = self
            .client
            .get_balance(account, None)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        let mut mc = Multicall::new(self.client.clone(), self.targets.multicall).await?;
        mc.add_call(token.balance_of(account), false);
        mc.add_call(token.allowance(account, harness), false);
        let (kala_balance, kala_allowance): (U256, U256) = mc.call().await?;

        let positions = self.fetch_positions(account).await;
        log::debug!(
            "Account {:?}: ETH: {}, KALA: {}, allowance: {}, positions: {}",
            account,
            eth_balance,
            kala_balance,
            kala_allowance,
            positions.len()
        );

        Ok(AccountSnapshot {
            account,
            eth_balance,
            kala_balance,
            kala_allowance,
            positions,
            fetched_at: Utc::now(),
        })
    }
}

/// Scale a feed answer with `decimals` to 18 decimals. Non-positive answers
/// are rejected.
pub fn normalize_feed_answer(answer: I256, decimals: u8) -> Result<U256, ChainError> {
    if answer <= I256::zero() {
        return Err(ChainError::InvalidInput(format!("non-positive feed answer {}", answer)));
    }
    let raw = answer.into_raw();
    let decimals = u32::from(decimals);
    if decimals <= 18 {
        raw.checked_mul(U256::exp10((18 - decimals) as usize))
            .ok_or_else(|| ChainError::InvalidInput("feed answer overflows".to_string()))
    } else {
        Ok(raw / U256::exp10((decimals - 18) as usize))
    }
}
