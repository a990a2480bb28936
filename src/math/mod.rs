pub mod liquidity_amounts;
pub mod tick_math;
pub mod units;
