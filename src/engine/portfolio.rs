use ethers::types::{Address, U256};
use rust_decimal::Decimal;

use crate::engine::earn::AccountPosition;
use crate::errors::ChainError;
use crate::math::units::wei_to_decimal;
use crate::models::{AccountSnapshot, PoolSnapshot};

/// Wallet balances plus what the account has supplied to the pool.
#[derive(Debug, Clone)]
pub struct PortfolioOverview {
    pub account: Address,
    pub eth_balance: U256,
    pub kala_balance: U256,
    pub kala_allowance: U256,
    pub liquidity: u128,
    pub supplied_eth: U256,
    pub supplied_kala: U256,
    pub supplied_usd: Decimal,
    pub wallet_usd: Decimal,
}

pub fn compose_portfolio(pool: &PoolSnapshot, account: &AccountSnapshot) -> Result<PortfolioOverview, ChainError> {
    let position = AccountPosition::from_snapshot(&pool.slot0, account)?;
    let eth_usd = pool.prices.eth_usd();
    let kala_usd = pool.prices.kala_usd();
    let usd = |eth: U256, kala: U256| -> Result<Decimal, ChainError> {
        wei_to_decimal(eth, 18)
            .checked_mul(eth_usd)
            .zip(wei_to_decimal(kala, 18).checked_mul(kala_usd))
            .and_then(|(eth_value, kala_value)| eth_value.checked_add(kala_value))
            .ok_or_else(|| ChainError::InvalidInput("USD value out of range".to_string()))
    };

    Ok(PortfolioOverview {
        account: position.account,
        eth_balance: position.eth_balance,
        kala_balance: position.kala_balance,
        kala_allowance: position.kala_allowance,
        liquidity: position.liquidity,
        supplied_eth: position.eth_amount,
        supplied_kala: position.kala_amount,
        supplied_usd: usd(position.eth_amount, position.kala_amount)?,
        wallet_usd: usd(position.eth_balance, position.kala_balance)?,
    })
}
