// Conversions between contract integers (U256 / I256), BigInt math values and
// human-readable decimal strings.

use std::str::FromStr;

use ethers::types::{I256, U256};
use ethers::utils::{format_units, parse_ether};
use num_bigint::{BigInt, Sign};
use num_traits::Signed;
use rust_decimal::prelude::*;

use crate::errors::ChainError;

pub fn u256_to_bigint(u: U256) -> BigInt {
    let mut buf = [0u8; 32];
    u.to_big_endian(&mut buf);
    BigInt::from_bytes_be(Sign::Plus, &buf)
}

pub fn bigint_to_u256(v: &BigInt) -> Result<U256, ChainError> {
    if v.is_negative() {
        return Err(ChainError::InvalidInput(format!("negative value {} for uint256", v)));
    }
    let (_, bytes) = v.to_bytes_be();
    if bytes.len() > 32 {
        return Err(ChainError::InvalidInput(format!("value {} overflows uint256", v)));
    }
    Ok(U256::from_big_endian(&bytes))
}

pub fn bigint_to_i256(v: &BigInt) -> Result<I256, ChainError> {
    I256::from_dec_str(&v.to_string())
        .map_err(|e| ChainError::InvalidInput(format!("value {} does not fit int256: {}", v, e)))
}

/// Parse a decimal ether string ("1.5") into wei.
pub fn parse_amount(amount: &str) -> Result<U256, ChainError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ChainError::InvalidInput("amount is empty".to_string()));
    }
    parse_ether(trimmed)
        .map_err(|e| ChainError::InvalidInput(format!("invalid amount '{}': {}", trimmed, e)))
}

/// wei -> Decimal with 18 decimals. Falls back to zero when the value does not
/// fit rust_decimal's 96-bit mantissa.
pub fn wei_to_decimal(wei: U256, decimals: u32) -> Decimal {
    format_units(wei, decimals)
        .ok()
        .and_then(|s| Decimal::from_str(&s).ok())
        .unwrap_or(Decimal::ZERO)
}

/// Round half away from zero and render with exactly `dp` fractional digits.
pub fn to_fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Render with at most `max_dp` fractional digits, trailing zeros trimmed.
pub fn to_display(value: Decimal, max_dp: u32) -> String {
    value
        .round_dp_with_strategy(max_dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

/// "0x1234...abcd" style shortening used for addresses and hashes.
pub fn shorten_hex(value: &str, head: usize, tail: usize) -> String {
    if value.len() <= head + tail {
        return value.to_string();
    }
    format!("{}...{}", &value[..head], &value[value.len() - tail..])
}
