// tests/earn_flow_integration.rs
// ==============================
// Add/remove sizing, paired quotes and the composed earn/portfolio views,
// driven from in-memory snapshots (no RPC).

use chrono::Utc;
use ethers::types::{Address, I256, U256};
use kala_liquidity::chain::pool::PoolKey;
use kala_liquidity::chain::registry::Deployment;
use kala_liquidity::engine::earn::*;
use kala_liquidity::engine::portfolio::compose_portfolio;
use kala_liquidity::errors::ChainError;
use kala_liquidity::math::liquidity_amounts::q96;
use kala_liquidity::math::units::bigint_to_u256;
use kala_liquidity::models::*;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::str::FromStr;

fn ether(n: u64) -> U256 {
    U256::exp10(18) * n
}

fn price_one() -> Slot0 {
    Slot0 {
        sqrt_price_x96: bigint_to_u256(&q96()).unwrap(),
        tick: 0,
        protocol_fee: 0,
        lp_fee: 3000,
    }
}

fn pool_snapshot(slot0: Slot0) -> PoolSnapshot {
    PoolSnapshot {
        slot0,
        liquidity: 1_000_000,
        hook: None,
        prices: OraclePrices { kala_usd: Some(ether(1)), eth_usd: Some(ether(3000)) },
        fetched_at: Utc::now(),
    }
}

fn account_snapshot(liquidity: u128) -> AccountSnapshot {
    AccountSnapshot {
        account: Address::from_low_u64_be(0xbeef),
        eth_balance: ether(2),
        kala_balance: ether(500),
        kala_allowance: U256::zero(),
        positions: vec![
            PositionReading { source: "harness".parse().unwrap(), liquidity: liquidity / 2 },
            PositionReading { source: "harness@legacy".parse().unwrap(), liquidity: liquidity - liquidity / 2 },
        ],
        fetched_at: Utc::now(),
    }
}

#[test]
fn test_uninitialized_pool_uses_smaller_amount() {
    let plan = plan_add("1", "2.5", Some(&Slot0::default())).unwrap();
    println!("uninitialized plan: {:?}", plan);
    assert_eq!(plan.eth_wei, ether(1));
    assert_eq!(plan.kala_wei, U256::from_dec_str("2500000000000000000").unwrap());
    assert_eq!(plan.liquidity_delta, I256::from_dec_str("1000000000000000000").unwrap());

    // no slot0 at all behaves the same
    assert_eq!(plan_add("1", "2.5", None).unwrap(), plan);
}

#[test]
fn test_add_requires_both_amounts() {
    for (eth, kala) in [("", "1"), ("1", ""), ("0", "1"), ("1", "0.0"), ("abc", "1"), (".", "1")] {
        let result = plan_add(eth, kala, Some(&price_one()));
        assert!(matches!(result, Err(ChainError::InvalidInput(_))), "({}, {}) accepted", eth, kala);
    }
}

#[test]
fn test_add_at_price_one_is_balanced() {
    let plan = plan_add("1", "1", Some(&price_one())).unwrap();
    let delta = BigInt::from_str(&plan.liquidity_delta.to_string()).unwrap();
    let one = BigInt::from(10u64).pow(18);
    assert!(delta >= one);
    assert!(delta < &one + &one / 1000);
}

#[test]
fn test_paired_quotes() {
    let rate = Decimal::from(2500);
    let q = quote_paired("1.5", QuoteSide::Eth, rate).unwrap();
    assert_eq!(q.amount_kala.as_deref(), Some("3750.0000"));
    assert_eq!(q.amount_eth.as_deref(), Some("1.5"));

    let q = quote_paired("100", QuoteSide::Kala, rate).unwrap();
    assert_eq!(q.amount_eth.as_deref(), Some("0.040000"));

    // clearing one side clears the other
    let q = quote_paired("", QuoteSide::Eth, rate).unwrap();
    assert_eq!(q.amount_kala.as_deref(), Some(""));

    // no rate: the other side is left alone
    let q = quote_paired("3", QuoteSide::Eth, Decimal::ZERO).unwrap();
    assert_eq!(q.amount_kala, None);

    assert!(quote_paired("1.2.3", QuoteSide::Eth, rate).is_err());
}

#[test]
fn test_remove_amount_uses_basis_points() {
    let liquidity = BigInt::from(1_000_000u64);
    assert_eq!(remove_amount(&liquidity, Decimal::from(100)), liquidity);
    assert_eq!(remove_amount(&liquidity, Decimal::from(25)), BigInt::from(250_000u64));
    // 33.339 -> 3333 basis points
    assert_eq!(
        remove_amount(&liquidity, Decimal::from_str("33.339").unwrap()),
        BigInt::from(333_300u64)
    );

    assert!(validate_remove(Decimal::ZERO, &liquidity).is_err());
    assert!(validate_remove(Decimal::from(101), &liquidity).is_err());
    assert!(validate_remove(Decimal::from(50), &BigInt::from(0u8)).is_err());
    // 0.001% of 10 rounds to nothing
    assert!(validate_remove(Decimal::from_str("0.001").unwrap(), &BigInt::from(10u8)).is_err());
}

#[test]
fn test_remove_preview_scales_with_percent() {
    let slot0 = price_one();
    let full = preview_remove(&slot0, 1_000_000_000_000, Decimal::from(100)).unwrap();
    let half = preview_remove(&slot0, 1_000_000_000_000, Decimal::from(50)).unwrap();
    println!("full: {:?}\nhalf: {:?}", full, half);
    assert_eq!(half.remove_liquidity * 2u32, full.remove_liquidity);
    assert!(half.eth_wei <= full.eth_wei / U256::from(2u8));
    assert!(half.kala_wei <= full.kala_wei / U256::from(2u8));

    let none = preview_remove(&slot0, 1_000_000_000_000, Decimal::ZERO).unwrap();
    assert!(none.eth_wei.is_zero() && none.kala_wei.is_zero());
}

#[test]
fn test_compose_earn_and_portfolio() {
    let deployment = Deployment::for_chain(11_155_111).unwrap();
    let key = PoolKey::kala_pool(deployment.kala_money, deployment.kala_hook);
    let pool = pool_snapshot(price_one());
    let account = account_snapshot(ether(1).as_u128());

    let earn = compose_earn(key, &pool, Some(&account)).unwrap();
    assert_eq!(earn.eth_to_kala_rate, Decimal::from(3000));
    assert_eq!(earn.kala_usd, Decimal::ONE);
    let position = earn.position.unwrap();
    assert_eq!(position.liquidity, ether(1).as_u128());
    assert_eq!(position.positions.len(), 2);
    // full range at price 1 holds just under one of each token per unit of L
    assert!(position.eth_amount <= ether(1) && position.eth_amount > ether(1) * 999u64 / 1000u64);

    let portfolio = compose_portfolio(&pool, &account).unwrap();
    assert_eq!(portfolio.wallet_usd, Decimal::from(2 * 3000 + 500));
    assert!(portfolio.supplied_usd > Decimal::from(2990) && portfolio.supplied_usd <= Decimal::from(3001));

    let without_account = compose_earn(key, &pool, None).unwrap();
    assert!(without_account.position.is_none());
}
