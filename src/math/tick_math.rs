// Exact TickMath.getSqrtPriceAtTick over BigInt.
//
// Only used to derive (and cross-check) the sqrt-price bounds of the full-range
// position; the pool price itself always comes from slot0.

use num_bigint::BigInt;
use num_traits::One;

use super::liquidity_amounts::LiquidityMathError;

pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;

/// sqrt price at MIN_TICK / MAX_TICK, Q64.96
pub const MIN_SQRT_PRICE: u128 = 4_295_128_739;
pub const MAX_SQRT_PRICE: &str = "1461446703485210103287273052203988822378723970342";

/// Per-bit ratio multipliers (Q128.128) for ticks 0x2 through 0x80000.
const STEPS: [(u32, &str); 19] = [
    (0x2, "fff97272373d413259a46990580e213a"),
    (0x4, "fff2e50f5f656932ef12357cf3c7fdcc"),
    (0x8, "ffe5caca7e10e4e61c3624eaa0941cd0"),
    (0x10, "ffcb9843d60f6159c9db58835c926644"),
    (0x20, "ff973b41fa98c081472e6896dfb254c0"),
    (0x40, "ff2ea16466c96a3843ec78b326b52861"),
    (0x80, "fe5dee046a99a2a811c461f1969c3053"),
    (0x100, "fcbe86c7900a88aedcffc83b479aa3a4"),
    (0x200, "f987a7253ac413176f2b074cf7815e54"),
    (0x400, "f3392b0822b70005940c7a398e4b70f3"),
    (0x800, "e7159475a2c29b7443b29c7fa6e889d9"),
    (0x1000, "d097f3bdfd2022b8845ad8f792aa5825"),
    (0x2000, "a9f746462d870fdf8a65dc1f90e061e5"),
    (0x4000, "70d869a156d2a1b890bb3df62baf32f7"),
    (0x8000, "31be135f97d08fd981231505542fcfa6"),
    (0x10000, "09aa508b5b7a84e1c677de54f3e99bc9"),
    (0x20000, "05d6af8dedb81196699c329225ee604"),
    (0x40000, "2216e584f5fa1ea926041bedfe98"),
    (0x80000, "48a170391f7dc42444e8fa2"),
];

/// Q64.96 sqrt price for `tick`, rounded up like the on-chain library.
pub fn get_sqrt_price_at_tick(tick: i32) -> Result<BigInt, LiquidityMathError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(LiquidityMathError::TickOutOfRange(tick));
    }
    let abs_tick = tick.unsigned_abs();

    // ratio is Q128.128
    let mut ratio = if abs_tick & 0x1 != 0 {
        hex_const("fffcb933bd6fad37aa2d162d1a594001")
    } else {
        BigInt::one() << 128
    };

    for (mask, multiplier) in STEPS {
        if abs_tick & mask != 0 {
            ratio = (&ratio * hex_const(multiplier)) >> 128;
        }
    }

    if tick > 0 {
        let max = (BigInt::one() << 256) - 1;
        ratio = max / ratio;
    }

    // Q128.128 -> Q64.96, rounding up
    Ok((&ratio + ((BigInt::one() << 32) - 1)) >> 32)
}

fn hex_const(digits: &str) -> BigInt {
    BigInt::parse_bytes(digits.as_bytes(), 16).expect("Failed to parse tick ratio constant")
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;
    use std::str::FromStr;

    #[test]
    fn test_bounds_match_known_constants() {
        assert_eq!(
            get_sqrt_price_at_tick(MIN_TICK).unwrap(),
            BigInt::from(MIN_SQRT_PRICE)
        );
        assert_eq!(
            get_sqrt_price_at_tick(MAX_TICK).unwrap(),
            BigInt::from_str(MAX_SQRT_PRICE).unwrap()
        );
    }

    #[test]
    fn test_ratio_table_is_well_formed() {
        let one = BigInt::one() << 128;
        let mut previous = hex_const("fffcb933bd6fad37aa2d162d1a594001");
        for (mask, digits) in STEPS {
            let ratio = hex_const(digits);
            assert!(ratio > BigInt::zero() && ratio < one, "bit {:#x}", mask);
            assert!(ratio < previous, "bit {:#x} not decreasing", mask);
            previous = ratio;
        }
    }

    #[test]
    fn test_tick_zero_is_q96() {
        assert_eq!(get_sqrt_price_at_tick(0).unwrap(), BigInt::one() << 96);
    }

    #[test]
    fn test_monotonic_around_zero() {
        let below = get_sqrt_price_at_tick(-60).unwrap();
        let at = get_sqrt_price_at_tick(0).unwrap();
        let above = get_sqrt_price_at_tick(60).unwrap();
        assert!(below < at && at < above);
    }

    #[test]
    fn test_out_of_range_tick_is_rejected() {
        assert!(matches!(
            get_sqrt_price_at_tick(MAX_TICK + 1),
            Err(LiquidityMathError::TickOutOfRange(t)) if t == MAX_TICK + 1
        ));
        assert!(get_sqrt_price_at_tick(MIN_TICK - 1).is_err());
    }
}
