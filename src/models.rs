use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::math::units::wei_to_decimal;

/// Price used when the KALA oracle cannot be read.
pub const DEFAULT_KALA_USD: Decimal = Decimal::ONE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub protocol_fee: u32,
    pub lp_fee: u32,
}

impl Slot0 {
    /// A pool that was never initialized reports a zero sqrt price.
    pub fn is_initialized(&self) -> bool {
        !self.sqrt_price_x96.is_zero()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionInfo {
    pub liquidity: u128,
    pub fee_growth_inside0_last_x128: U256,
    pub fee_growth_inside1_last_x128: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookConfig {
    pub kala_oracle: Address,
    pub eth_usd_feed: Address,
    pub kala_token: Address,
}

/// USD prices normalized to 18 decimals; `None` when the feed was unreadable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OraclePrices {
    pub kala_usd: Option<U256>,
    pub eth_usd: Option<U256>,
}

impl OraclePrices {
    pub fn kala_usd(&self) -> Decimal {
        self.kala_usd
            .map(|p| wei_to_decimal(p, 18))
            .unwrap_or(DEFAULT_KALA_USD)
    }

    pub fn eth_usd(&self) -> Decimal {
        self.eth_usd.map(|p| wei_to_decimal(p, 18)).unwrap_or(Decimal::ZERO)
    }

    /// KALA per ETH implied by the two feeds; zero when either side is missing
    /// or the ratio does not fit a Decimal.
    pub fn eth_to_kala_rate(&self) -> Decimal {
        let kala = self.kala_usd();
        if kala > Decimal::ZERO {
            self.eth_usd().checked_div(kala).unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub slot0: Slot0,
    pub liquidity: u128,
    pub hook: Option<HookConfig>,
    pub prices: OraclePrices,
    pub fetched_at: DateTime<Utc>,
}

/// Whose position to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOwner {
    /// The modify-liquidity harness (it is msg.sender to the pool manager).
    Harness,
    /// The account being viewed.
    Account,
    Fixed(Address),
}

/// Which pool to read it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionPool {
    Current,
    /// Same pool key under the previously deployed hook.
    Legacy,
}

/// One place a user's liquidity may be recorded. The account's liquidity is
/// the sum over all configured sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSource {
    pub owner: PositionOwner,
    pub pool: PositionPool,
}

impl FromStr for PositionSource {
    type Err = String;

    /// `harness`, `account`, `0x…`, each optionally suffixed with `@legacy`
    /// or `@current`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (owner_part, pool_part) = match s.split_once('@') {
            Some((o, p)) => (o.trim(), p.trim()),
            None => (s, "current"),
        };
        let owner = match owner_part.to_ascii_lowercase().as_str() {
            "harness" => PositionOwner::Harness,
            "account" => PositionOwner::Account,
            other if other.starts_with("0x") => PositionOwner::Fixed(
                Address::from_str(owner_part).map_err(|e| format!("invalid owner '{}': {}", owner_part, e))?,
            ),
            _ => return Err(format!("unknown position owner '{}'", owner_part)),
        };
        let pool = match pool_part.to_ascii_lowercase().as_str() {
            "current" => PositionPool::Current,
            "legacy" => PositionPool::Legacy,
            _ => return Err(format!("unknown position pool '{}'", pool_part)),
        };
        Ok(PositionSource { owner, pool })
    }
}

impl fmt::Display for PositionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            PositionOwner::Harness => write!(f, "harness")?,
            PositionOwner::Account => write!(f, "account")?,
            PositionOwner::Fixed(a) => write!(f, "{:?}", a)?,
        }
        match self.pool {
            PositionPool::Current => Ok(()),
            PositionPool::Legacy => write!(f, "@legacy"),
        }
    }
}

pub fn parse_position_sources(list: &str) -> Result<Vec<PositionSource>, String> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(PositionSource::from_str)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionReading {
    pub source: PositionSource,
    pub liquidity: u128,
}

#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub account: Address,
    pub eth_balance: U256,
    pub kala_balance: U256,
    pub kala_allowance: U256,
    pub positions: Vec<PositionReading>,
    pub fetched_at: DateTime<Utc>,
}

impl AccountSnapshot {
    pub fn total_liquidity(&self) -> u128 {
        self.positions
            .iter()
            .fold(0u128, |acc, p| acc.saturating_add(p.liquidity))
    }
}
