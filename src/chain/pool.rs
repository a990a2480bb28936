use ethers::abi::{self, Token};
use ethers::types::{Address, I256, U256};
use ethers::utils::keccak256;
use num_bigint::BigInt;
use serde::Serialize;
use std::str::FromStr;

/// Full-range position bounds for tick spacing 60.
pub const TICK_LOWER: i32 = -887_220;
pub const TICK_UPPER: i32 = 887_220;

/// Sqrt-price bounds used for amount previews: ticks -887271 and 887270,
/// slightly outside the position's ticks.
pub const SQRT_PRICE_LOWER: &str = "4295343490";
pub const SQRT_PRICE_UPPER: &str = "1461300573427867316570072651998408279850435624081";

pub const KALA_POOL_FEE: u32 = 3000;
pub const KALA_POOL_TICK_SPACING: i32 = 60;

/// Positions opened through the test harness all use the zero salt.
pub const DEFAULT_SALT: [u8; 32] = [0u8; 32];

pub type PoolId = [u8; 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolKey {
    pub currency0: Address,
    pub currency1: Address,
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: Address,
}

impl PoolKey {
    /// Native ETH (address zero) paired with `token` under `hooks`.
    pub fn native_pair(token: Address, fee: u32, tick_spacing: i32, hooks: Address) -> Self {
        let eth = Address::zero();
        let (currency0, currency1) = if eth < token { (eth, token) } else { (token, eth) };
        PoolKey { currency0, currency1, fee, tick_spacing, hooks }
    }

    /// The KALA/ETH pool governed by `hooks`.
    pub fn kala_pool(kala: Address, hooks: Address) -> Self {
        Self::native_pair(kala, KALA_POOL_FEE, KALA_POOL_TICK_SPACING, hooks)
    }

    /// keccak256(abi.encode(currency0, currency1, fee, tickSpacing, hooks))
    pub fn pool_id(&self) -> PoolId {
        keccak256(abi::encode(&self.tokens()))
    }

    pub fn pool_id_hex(&self) -> String {
        format!("0x{}", hex::encode(self.pool_id()))
    }

    /// ABI tuple form used both for hashing and as the `key` call argument.
    pub fn as_tuple(&self) -> (Address, Address, u32, i32, Address) {
        (self.currency0, self.currency1, self.fee, self.tick_spacing, self.hooks)
    }

    fn tokens(&self) -> Vec<Token> {
        vec![
            Token::Address(self.currency0),
            Token::Address(self.currency1),
            Token::Uint(U256::from(self.fee)),
            Token::Int(I256::from(self.tick_spacing).into_raw()),
            Token::Address(self.hooks),
        ]
    }
}

pub fn full_range_sqrt_prices() -> (BigInt, BigInt) {
    (
        BigInt::from_str(SQRT_PRICE_LOWER).unwrap_or_default(),
        BigInt::from_str(SQRT_PRICE_UPPER).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::get_sqrt_price_at_tick;

    fn kala() -> Address {
        Address::from_str("0xAF53484b277e9b7e9Fb224D2e534ee9beB68B7BA").unwrap()
    }

    fn hook() -> Address {
        Address::from_str("0x3485cE0473ABcefAFF025aa7aCed6438d3d84080").unwrap()
    }

    #[test]
    fn test_native_currency_sorts_first() {
        let key = PoolKey::kala_pool(kala(), hook());
        assert_eq!(key.currency0, Address::zero());
        assert_eq!(key.currency1, kala());
        assert_eq!(key.fee, 3000);
        assert_eq!(key.tick_spacing, 60);
    }

    #[test]
    fn test_pool_id_matches_tuple_encoding() {
        let key = PoolKey::kala_pool(kala(), hook());
        // abi.encode of a static tuple equals the concatenated 32-byte words
        let mut words = Vec::new();
        words.extend_from_slice(&[0u8; 32]);
        let mut kala_word = [0u8; 32];
        kala_word[12..].copy_from_slice(kala().as_bytes());
        words.extend_from_slice(&kala_word);
        let mut fee_word = [0u8; 32];
        fee_word[30..].copy_from_slice(&3000u16.to_be_bytes());
        words.extend_from_slice(&fee_word);
        let mut spacing_word = [0u8; 32];
        spacing_word[31] = 60;
        words.extend_from_slice(&spacing_word);
        let mut hook_word = [0u8; 32];
        hook_word[12..].copy_from_slice(hook().as_bytes());
        words.extend_from_slice(&hook_word);

        assert_eq!(key.pool_id(), keccak256(words));
        assert_eq!(key.pool_id_hex().len(), 66);
    }

    #[test]
    fn test_pool_id_changes_with_hook() {
        let current = PoolKey::kala_pool(kala(), hook());
        let legacy = PoolKey::kala_pool(kala(), Address::from([0x11; 20]));
        assert_ne!(current.pool_id(), legacy.pool_id());
        assert_eq!(current.pool_id(), PoolKey::kala_pool(kala(), hook()).pool_id());
    }

    #[test]
    fn test_negative_tick_spacing_is_sign_extended() {
        let key = PoolKey { tick_spacing: -1, ..PoolKey::kala_pool(kala(), hook()) };
        let encoded = abi::encode(&key.tokens());
        assert!(encoded[96..128].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_preview_bounds_tick_provenance() {
        let (lower, upper) = full_range_sqrt_prices();
        assert_eq!(lower, get_sqrt_price_at_tick(-887_271).unwrap());
        assert_eq!(upper, get_sqrt_price_at_tick(887_270).unwrap());
        // both bounds enclose the position's own tick range
        assert!(lower < get_sqrt_price_at_tick(TICK_LOWER).unwrap());
        assert!(upper > get_sqrt_price_at_tick(TICK_UPPER).unwrap());
    }
}
