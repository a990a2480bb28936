use ethers::types::{Address, H256, I256, U256};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::*;

use crate::chain::pool::{full_range_sqrt_prices, PoolKey};
use crate::errors::ChainError;
use crate::math::liquidity_amounts::{amounts_for_liquidity, liquidity_for_amounts, LiquidityMathError};
use crate::math::units::{bigint_to_i256, bigint_to_u256, parse_amount, to_fixed, u256_to_bigint};
use crate::models::{AccountSnapshot, HookConfig, PoolSnapshot, PositionReading, Slot0};

pub const POOL_PAIR_LABEL: &str = "KALA / ETH";
pub const FEE_TIER_LABEL: &str = "0.30%";
pub const MIN_DYNAMIC_FEE_PERCENT: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
pub const MAX_DYNAMIC_FEE_PERCENT: Decimal = Decimal::from_parts(100, 0, 0, false, 1);

/// Paired amounts are rendered with these many fractional digits.
const KALA_QUOTE_DP: u32 = 4;
const ETH_QUOTE_DP: u32 = 6;

/// Both tokens use 18 decimals; finer amounts cannot be represented in wei.
pub const MAX_AMOUNT_DECIMALS: usize = 18;

static AMOUNT_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]*\.?[0-9]*$").expect("Failed to compile amount pattern"));

/// ASCII digits with at most one decimal point; the empty string is accepted.
pub fn is_valid_amount_input(value: &str) -> bool {
    AMOUNT_INPUT.is_match(value)
}

/// Lenient numeric read of an accepted input ("1." and ".5" parse, "." does not).
pub fn parse_amount_input(value: &str) -> Option<Decimal> {
    if !is_valid_amount_input(value) || value.is_empty() || value == "." {
        return None;
    }
    let normalized = match (value.starts_with('.'), value.ends_with('.')) {
        (true, _) => format!("0{}", value),
        (_, true) => value.trim_end_matches('.').to_string(),
        _ => value.to_string(),
    };
    Decimal::from_str(&normalized).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSide {
    Eth,
    Kala,
}

/// Result of editing one side of the add form. `None` means "leave as is".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedQuote {
    pub amount_eth: Option<String>,
    pub amount_kala: Option<String>,
}

/// Fill in the other side of the add form from the oracle rate (KALA per ETH).
pub fn quote_paired(input: &str, side: QuoteSide, rate: Decimal) -> Result<PairedQuote, ChainError> {
    if !is_valid_amount_input(input) {
        return Err(ChainError::InvalidInput(format!("'{}' is not a valid amount", input)));
    }

    let other = if input.is_empty() {
        Some(String::new())
    } else if rate > Decimal::ZERO {
        match parse_amount_input(input) {
            Some(value) => {
                let paired = match side {
                    QuoteSide::Eth => value.checked_mul(rate).map(|v| to_fixed(v, KALA_QUOTE_DP)),
                    QuoteSide::Kala => value.checked_div(rate).map(|v| to_fixed(v, ETH_QUOTE_DP)),
                };
                Some(paired.ok_or_else(|| {
                    ChainError::InvalidInput(format!("'{}' is too large to quote", input))
                })?)
            }
            None => None,
        }
    } else {
        None
    };

    Ok(match side {
        QuoteSide::Eth => PairedQuote { amount_eth: Some(input.to_string()), amount_kala: other },
        QuoteSide::Kala => PairedQuote { amount_eth: other, amount_kala: Some(input.to_string()) },
    })
}

/// Liquidity delta for an add. An uninitialized pool (sqrt price 0) falls
/// back to the smaller of the two raw amounts.
pub fn size_liquidity_delta(
    sqrt_price_x96: &BigInt,
    eth_wei: &BigInt,
    kala_wei: &BigInt,
) -> Result<BigInt, LiquidityMathError> {
    if sqrt_price_x96.is_zero() {
        return Ok(if eth_wei < kala_wei { eth_wei.clone() } else { kala_wei.clone() });
    }
    let (lower, upper) = full_range_sqrt_prices();
    liquidity_for_amounts(sqrt_price_x96, &lower, &upper, eth_wei, kala_wei)
}

/// Everything needed to submit approve + add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPlan {
    pub eth_wei: U256,
    pub kala_wei: U256,
    pub liquidity_delta: I256,
}

/// Validate the two form amounts and size the position. A missing slot0
/// counts as an uninitialized pool.
pub fn plan_add(amount_eth: &str, amount_kala: &str, slot0: Option<&Slot0>) -> Result<AddPlan, ChainError> {
    let eth = parse_amount_input(amount_eth).filter(|v| *v > Decimal::ZERO);
    let kala = parse_amount_input(amount_kala).filter(|v| *v > Decimal::ZERO);
    if eth.is_none() || kala.is_none() {
        return Err(ChainError::InvalidInput("both ETH and KALA amounts must be greater than zero".to_string()));
    }
    for amount in [amount_eth, amount_kala] {
        if fraction_digits(amount) > MAX_AMOUNT_DECIMALS {
            return Err(ChainError::InvalidInput(format!(
                "'{}' has more than {} decimal places",
                amount, MAX_AMOUNT_DECIMALS
            )));
        }
    }

    let eth_wei = parse_amount(amount_eth)?;
    let kala_wei = parse_amount(amount_kala)?;
    let sqrt_price = slot0.map(|s| u256_to_bigint(s.sqrt_price_x96)).unwrap_or_default();

    let delta = size_liquidity_delta(&sqrt_price, &u256_to_bigint(eth_wei), &u256_to_bigint(kala_wei))?;
    if delta.is_zero() {
        return Err(ChainError::InvalidInput("amounts are too small to mint liquidity".to_string()));
    }
    Ok(AddPlan { eth_wei, kala_wei, liquidity_delta: bigint_to_i256(&delta)? })
}

fn fraction_digits(value: &str) -> usize {
    value.split_once('.').map(|(_, fraction)| fraction.len()).unwrap_or(0)
}

/// userLiquidity * floor(percent * 100) / 10000
pub fn remove_amount(user_liquidity: &BigInt, percent: Decimal) -> BigInt {
    let basis_points = (percent * Decimal::ONE_HUNDRED).floor().to_i64().unwrap_or(0).max(0);
    user_liquidity * BigInt::from(basis_points) / BigInt::from(10_000)
}

pub fn validate_remove(percent: Decimal, user_liquidity: &BigInt) -> Result<BigInt, ChainError> {
    if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ChainError::InvalidInput(format!("percent must be in (0, 100], got {}", percent)));
    }
    if user_liquidity.is_zero() {
        return Err(ChainError::InvalidInput("no liquidity to remove".to_string()));
    }
    let amount = remove_amount(user_liquidity, percent);
    if amount.is_zero() {
        return Err(ChainError::InvalidInput("removal rounds down to zero liquidity".to_string()));
    }
    Ok(amount)
}

/// Token amounts backing `liquidity` at the pool's current price.
pub fn estimated_amounts(slot0: &Slot0, liquidity: &BigInt) -> Result<(BigInt, BigInt), LiquidityMathError> {
    let (lower, upper) = full_range_sqrt_prices();
    amounts_for_liquidity(&u256_to_bigint(slot0.sqrt_price_x96), &lower, &upper, liquidity)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovePreview {
    pub percent: Decimal,
    pub user_liquidity: u128,
    pub remove_liquidity: BigInt,
    pub eth_wei: U256,
    pub kala_wei: U256,
}

pub fn preview_remove(slot0: &Slot0, user_liquidity: u128, percent: Decimal) -> Result<RemovePreview, ChainError> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ChainError::InvalidInput(format!("percent must be in [0, 100], got {}", percent)));
    }
    let remove_liquidity = remove_amount(&BigInt::from(user_liquidity), percent);
    let (eth, kala) = estimated_amounts(slot0, &remove_liquidity)?;
    Ok(RemovePreview {
        percent,
        user_liquidity,
        remove_liquidity,
        eth_wei: bigint_to_u256(&eth)?,
        kala_wei: bigint_to_u256(&kala)?,
    })
}

#[derive(Debug, Clone)]
pub struct AccountPosition {
    pub account: Address,
    pub eth_balance: U256,
    pub kala_balance: U256,
    pub kala_allowance: U256,
    pub liquidity: u128,
    pub eth_amount: U256,
    pub kala_amount: U256,
    pub positions: Vec<PositionReading>,
}

impl AccountPosition {
    pub fn from_snapshot(slot0: &Slot0, account: &AccountSnapshot) -> Result<Self, ChainError> {
        let liquidity = account.total_liquidity();
        let (eth, kala) = estimated_amounts(slot0, &BigInt::from(liquidity))?;
        Ok(AccountPosition {
            account: account.account,
            eth_balance: account.eth_balance,
            kala_balance: account.kala_balance,
            kala_allowance: account.kala_allowance,
            liquidity,
            eth_amount: bigint_to_u256(&eth)?,
            kala_amount: bigint_to_u256(&kala)?,
            positions: account.positions.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EarnOverview {
    pub pool_key: PoolKey,
    pub pool_id: H256,
    pub slot0: Slot0,
    pub pool_liquidity: u128,
    pub kala_usd: Decimal,
    pub eth_usd: Decimal,
    pub eth_to_kala_rate: Decimal,
    pub hook_config: Option<HookConfig>,
    pub position: Option<AccountPosition>,
}

pub fn compose_earn(
    pool_key: PoolKey,
    pool: &PoolSnapshot,
    account: Option<&AccountSnapshot>,
) -> Result<EarnOverview, ChainError> {
    let position = account
        .map(|a| AccountPosition::from_snapshot(&pool.slot0, a))
        .transpose()?;
    Ok(EarnOverview {
        pool_key,
        pool_id: H256::from(pool_key.pool_id()),
        slot0: pool.slot0,
        pool_liquidity: pool.liquidity,
        kala_usd: pool.prices.kala_usd(),
        eth_usd: pool.prices.eth_usd(),
        eth_to_kala_rate: pool.prices.eth_to_kala_rate(),
        hook_config: pool.hook,
        position,
    })
}
