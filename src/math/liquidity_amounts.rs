// LiquidityAmounts over BigInt
// ----------------------------
// Converts between a token amount pair and a position's liquidity for a given
// current sqrt price and a [lower, upper] sqrt-price range (all Q64.96).
//
// Rounding follows the periphery library exactly: every division truncates and
// the multiply-then-divide order is kept, so previews never promise more than
// the pool will register.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiquidityMathError {
    #[error("price range has zero width (lower == upper)")]
    ZeroWidthRange,
    #[error("sqrt price bound must be non-zero")]
    ZeroSqrtPrice,
    #[error("negative input: {0}")]
    NegativeInput(&'static str),
    #[error("tick {0} out of range")]
    TickOutOfRange(i32),
}

#[inline]
pub fn q96() -> BigInt {
    BigInt::one() << 96
}

#[inline]
fn mul_div(a: &BigInt, b: &BigInt, denominator: &BigInt) -> BigInt {
    (a * b).div_floor(denominator)
}

fn sorted<'a>(a: &'a BigInt, b: &'a BigInt) -> (&'a BigInt, &'a BigInt) {
    if a > b { (b, a) } else { (a, b) }
}

fn check_range(lower: &BigInt, upper: &BigInt) -> Result<(), LiquidityMathError> {
    if lower == upper {
        return Err(LiquidityMathError::ZeroWidthRange);
    }
    if lower.is_negative() {
        return Err(LiquidityMathError::NegativeInput("sqrt price"));
    }
    Ok(())
}

fn non_negative(v: &BigInt, what: &'static str) -> Result<(), LiquidityMathError> {
    if v.is_negative() {
        Err(LiquidityMathError::NegativeInput(what))
    } else {
        Ok(())
    }
}

/// L = amount0 * (sa * sb / Q96) / (sb - sa)
pub fn liquidity_for_amount0(
    sqrt_price_a_x96: &BigInt,
    sqrt_price_b_x96: &BigInt,
    amount0: &BigInt,
) -> Result<BigInt, LiquidityMathError> {
    let (sa, sb) = sorted(sqrt_price_a_x96, sqrt_price_b_x96);
    check_range(sa, sb)?;
    non_negative(amount0, "amount0")?;
    let intermediate = mul_div(sa, sb, &q96());
    Ok(mul_div(amount0, &intermediate, &(sb - sa)))
}

/// L = amount1 * Q96 / (sb - sa)
pub fn liquidity_for_amount1(
    sqrt_price_a_x96: &BigInt,
    sqrt_price_b_x96: &BigInt,
    amount1: &BigInt,
) -> Result<BigInt, LiquidityMathError> {
    let (sa, sb) = sorted(sqrt_price_a_x96, sqrt_price_b_x96);
    check_range(sa, sb)?;
    non_negative(amount1, "amount1")?;
    Ok(mul_div(amount1, &q96(), &(sb - sa)))
}

/// Maximum liquidity the amount pair can mint at the current price.
///
/// Below the range only token0 counts, above it only token1, inside it the
/// smaller of the two single-sided values.
pub fn liquidity_for_amounts(
    sqrt_price_x96: &BigInt,
    sqrt_price_lower_x96: &BigInt,
    sqrt_price_upper_x96: &BigInt,
    amount0: &BigInt,
    amount1: &BigInt,
) -> Result<BigInt, LiquidityMathError> {
    let (lower, upper) = sorted(sqrt_price_lower_x96, sqrt_price_upper_x96);
    check_range(lower, upper)?;
    non_negative(sqrt_price_x96, "sqrt price")?;

    if sqrt_price_x96 <= lower {
        liquidity_for_amount0(lower, upper, amount0)
    } else if sqrt_price_x96 < upper {
        let liquidity0 = liquidity_for_amount0(sqrt_price_x96, upper, amount0)?;
        let liquidity1 = liquidity_for_amount1(lower, sqrt_price_x96, amount1)?;
        Ok(if liquidity0 < liquidity1 { liquidity0 } else { liquidity1 })
    } else {
        liquidity_for_amount1(lower, upper, amount1)
    }
}

/// amount0 = ((L << 96) * (sb - sa) / sb) / sa
pub fn amount0_for_liquidity(
    sqrt_price_a_x96: &BigInt,
    sqrt_price_b_x96: &BigInt,
    liquidity: &BigInt,
) -> Result<BigInt, LiquidityMathError> {
    let (sa, sb) = sorted(sqrt_price_a_x96, sqrt_price_b_x96);
    check_range(sa, sb)?;
    non_negative(liquidity, "liquidity")?;
    if sa.is_zero() {
        return Err(LiquidityMathError::ZeroSqrtPrice);
    }
    let numerator = liquidity << 96;
    Ok(mul_div(&numerator, &(sb - sa), sb).div_floor(sa))
}

/// amount1 = L * (sb - sa) / Q96
pub fn amount1_for_liquidity(
    sqrt_price_a_x96: &BigInt,
    sqrt_price_b_x96: &BigInt,
    liquidity: &BigInt,
) -> Result<BigInt, LiquidityMathError> {
    let (sa, sb) = sorted(sqrt_price_a_x96, sqrt_price_b_x96);
    check_range(sa, sb)?;
    non_negative(liquidity, "liquidity")?;
    Ok(mul_div(liquidity, &(sb - sa), &q96()))
}

/// Token amounts backing `liquidity` at the current price.
pub fn amounts_for_liquidity(
    sqrt_price_x96: &BigInt,
    sqrt_price_lower_x96: &BigInt,
    sqrt_price_upper_x96: &BigInt,
    liquidity: &BigInt,
) -> Result<(BigInt, BigInt), LiquidityMathError> {
    let (lower, upper) = sorted(sqrt_price_lower_x96, sqrt_price_upper_x96);
    check_range(lower, upper)?;
    non_negative(sqrt_price_x96, "sqrt price")?;

    if sqrt_price_x96 <= lower {
        Ok((amount0_for_liquidity(lower, upper, liquidity)?, BigInt::zero()))
    } else if sqrt_price_x96 < upper {
        Ok((
            amount0_for_liquidity(sqrt_price_x96, upper, liquidity)?,
            amount1_for_liquidity(lower, sqrt_price_x96, liquidity)?,
        ))
    } else {
        Ok((BigInt::zero(), amount1_for_liquidity(lower, upper, liquidity)?))
    }
}
