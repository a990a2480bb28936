// tests/api_integration_test.rs
// ===================================
// Endpoint structure and response format. Chain reads are served from a
// pre-filled snapshot cache; the configured RPC endpoint is unreachable, so
// anything that misses the cache exercises the error path.

use std::sync::Arc;

use chrono::Utc;
use ethers::types::{Address, U256};
use kala_liquidity::bootstrap::AppState;
use kala_liquidity::config::{Config, DEFAULT_EXPLORER_URL, DEFAULT_POSITION_SOURCES};
use kala_liquidity::math::liquidity_amounts::q96;
use kala_liquidity::math::units::bigint_to_u256;
use kala_liquidity::models::*;
use kala_liquidity::web::routes::*;
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use rocket::routes;
use serde_json::{json, Value};

fn read_only_config() -> Config {
    Config {
        // never dialled by these routes
        rpc_url: "http://127.0.0.1:1".to_string(),
        wallet_private_key: None,
        chain_id: 11_155_111,
        port: 8000,
        kala_money_address: None,
        kala_hook_address: None,
        state_view_address: None,
        pool_modify_liquidity_test_address: None,
        pool_manager_address: None,
        kala_legacy_hook_address: None,
        multicall_address: None,
        position_sources: DEFAULT_POSITION_SOURCES.to_string(),
        tracked_accounts: vec![],
        poll_interval_secs: 12,
        explorer_url: DEFAULT_EXPLORER_URL.to_string(),
    }
}

const HOLDER: u64 = 0xbeef;

fn ether(n: u64) -> U256 {
    U256::exp10(18) * n
}

fn holder() -> Address {
    Address::from_low_u64_be(HOLDER)
}

fn build_client(app_state: Arc<AppState>) -> Client {
    let rocket = rocket::build().manage(app_state).mount(
        "/",
        routes![
            health,
            deployment_config,
            earn_view,
            earn_quote,
            earn_remove_preview,
            earn_add,
            earn_remove,
            earn_status,
            portfolio,
            withdraw_validate,
            describe_error
        ],
    );
    Client::tracked(rocket).expect("valid rocket instance")
}

fn client() -> Client {
    build_client(Arc::new(AppState::new(&read_only_config()).expect("state")))
}

/// Pool at price 1 with KALA at 1 USD and ETH at 3000 USD, and one holder
/// with 2 ETH, 500 KALA and 2e18 liquidity split over two sources.
fn seeded_client() -> Client {
    let app_state = AppState::new(&read_only_config()).expect("state");
    {
        let mut cache = app_state.snapshots.blocking_write();
        cache.store_pool(PoolSnapshot {
            slot0: Slot0 {
                sqrt_price_x96: bigint_to_u256(&q96()).unwrap(),
                tick: 0,
                protocol_fee: 0,
                lp_fee: 3000,
            },
            liquidity: 5_000_000,
            hook: None,
            prices: OraclePrices { kala_usd: Some(ether(1)), eth_usd: Some(ether(3000)) },
            fetched_at: Utc::now(),
        });
        cache.store_account(AccountSnapshot {
            account: holder(),
            eth_balance: ether(2),
            kala_balance: ether(500),
            kala_allowance: U256::zero(),
            positions: vec![
                PositionReading { source: "harness".parse().unwrap(), liquidity: ether(1).as_u128() },
                PositionReading { source: "account".parse().unwrap(), liquidity: ether(1).as_u128() },
            ],
            fetched_at: Utc::now(),
        });
    }
    build_client(Arc::new(app_state))
}

fn get_json(client: &Client, uri: &str) -> Value {
    let response = client.get(uri).dispatch();
    assert_eq!(response.status(), Status::Ok, "GET {}", uri);
    response.into_json::<Value>().expect("json body")
}

#[test]
fn test_health() {
    let client = client();
    let response = client.get("/health").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().as_deref(), Some("OK"));
}

#[test]
fn test_config_response_structure() {
    let client = client();
    let body = get_json(&client, "/api/v1/config");
    println!("{}", serde_json::to_string_pretty(&body).expect("pretty"));

    assert_eq!(body["chain_id"], 11_155_111);
    assert_eq!(body["deployment_block"], 10_181_655);
    assert_eq!(body["tick_lower"], -887_220);
    assert_eq!(body["tick_upper"], 887_220);
    assert!(body["signer"].is_null());
    assert!(body["legacy_pool_id"].is_null());

    let contracts = &body["contracts"];
    assert_eq!(contracts["kala_hook"], "0x3485cE0473ABcefAFF025aa7aCed6438d3d84080");
    for field in ["kala_money", "pool_manager", "state_view", "pool_modify_liquidity_test"] {
        assert!(contracts[field].as_str().is_some_and(|s| s.starts_with("0x")), "{}", field);
    }

    let key = &body["pool_key"];
    assert_eq!(key["currency0"], "0x0000000000000000000000000000000000000000");
    assert_eq!(key["fee"], 3000);
    assert_eq!(key["tick_spacing"], 60);

    let pool_id = body["pool_id"].as_str().expect("pool_id");
    assert_eq!(pool_id.len(), 66);
    assert_eq!(
        body["position_sources"],
        json!(["harness", "account", "harness@legacy"])
    );
    assert_eq!(
        body["explorer_url"],
        "https://sepolia.etherscan.io/address/0x3485cE0473ABcefAFF025aa7aCed6438d3d84080"
    );
}

#[test]
fn test_idle_workflow_status() {
    let client = client();
    let body = get_json(&client, "/api/v1/earn/status");
    assert!(body["action"].is_null());
    assert_eq!(body["step"], "idle");
    assert_eq!(body["status"], "idle");
    assert_eq!(body["add_button_label"], "Provide Liquidity");
    assert_eq!(body["remove_button_label"], "Remove Liquidity");
    assert!(body["tx_hash"].is_null());
    assert!(body["error"].is_null());
}

#[test]
fn test_writes_rejected_without_signer() {
    let client = client();
    let response = client
        .post("/api/v1/earn/add")
        .header(ContentType::JSON)
        .body(json!({ "amount_eth": "1", "amount_kala": "3000" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_json::<Value>().expect("json body");
    assert_eq!(body["accepted"], false);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("signer")));
    assert_eq!(body["workflow"]["status"], "idle");
}

#[test]
fn test_withdraw_amount_validation() {
    let client = client();
    let cases = [
        ("1.5", true),
        ("", true),
        (".5", true),
        ("1.", true),
        ("1.2.3", false),
        ("abc", false),
        ("-1", false),
    ];
    for (amount, valid) in cases {
        let body = get_json(&client, &format!("/api/v1/withdraw/validate?amount={}", amount));
        assert_eq!(body["valid"], valid, "amount {:?}", amount);
        assert_eq!(body["error"].is_null(), valid);
    }
}

#[test]
fn test_describe_error_endpoint() {
    let client = client();
    let failure = json!({
        "shortMessage": "The contract function \"withdraw\" reverted.",
        "cause": { "data": { "errorName": "WithdrawDelayNotMet" } }
    });
    let response = client
        .post("/api/v1/errors/describe")
        .header(ContentType::JSON)
        .body(failure.to_string())
        .dispatch();
    let body = response.into_json::<Value>().expect("json body");
    assert_eq!(body["message"], "Withdrawal delay period not yet passed");

    let response = client
        .post("/api/v1/errors/describe")
        .header(ContentType::JSON)
        .body("null")
        .dispatch();
    let body = response.into_json::<Value>().expect("json body");
    assert_eq!(body["message"], "Unknown error");
}

#[test]
fn test_quote_from_cached_prices() {
    let client = seeded_client();
    let body = get_json(&client, "/api/v1/earn/quote?amount_eth=1.5");
    println!("{}", serde_json::to_string_pretty(&body).expect("pretty"));
    assert_eq!(body["eth_to_kala_rate"], "3000");
    assert_eq!(body["amount_eth"], "1.5");
    assert_eq!(body["amount_kala"], "4500.0000");
    assert!(body["error"].is_null());

    let body = get_json(&client, "/api/v1/earn/quote?amount_kala=300");
    assert_eq!(body["amount_eth"], "0.100000");

    let body = get_json(&client, "/api/v1/earn/quote?amount_eth=1.2.3");
    assert_eq!(body["amount_eth"], "1.2.3");
    assert!(body["error"].as_str().is_some_and(|e| e.contains("not a valid amount")));

    let body = get_json(&client, "/api/v1/earn/quote?amount_eth=1&amount_kala=2");
    assert!(body["error"].as_str().is_some_and(|e| e.contains("exactly one")));
}

#[test]
fn test_earn_view_from_cached_snapshots() {
    let client = seeded_client();
    let body = get_json(&client, &format!("/api/v1/earn?account={:?}", holder()));
    println!("{}", serde_json::to_string_pretty(&body).expect("pretty"));
    assert!(body["error"].is_null());
    assert_eq!(body["pool_pair"], "KALA / ETH");
    assert_eq!(body["oracle_price_usd"], "1.0000");
    assert_eq!(body["eth_price_usd"], "3000.00");
    assert_eq!(body["eth_to_kala_rate"], "3000");
    assert_eq!(body["pool"]["tick"], 0);
    assert_eq!(body["pool"]["liquidity"], "5000000");
    assert_eq!(body["pool"]["initialized"], true);

    let account = &body["account"];
    assert_eq!(account["eth_balance"], "2.0000");
    assert_eq!(account["kala_balance"], "500.00");
    assert_eq!(account["liquidity"], "2000000000000000000");
    assert_eq!(account["positions"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["workflow"]["status"], "idle");

    // no account and no signer: pool only
    let body = get_json(&client, "/api/v1/earn");
    assert!(body["error"].is_null());
    assert!(body["account"].is_null());
}

#[test]
fn test_remove_preview_from_cached_snapshots() {
    let client = seeded_client();
    let body = get_json(
        &client,
        &format!("/api/v1/earn/remove-preview?account={:?}&percent=50", holder()),
    );
    println!("{}", serde_json::to_string_pretty(&body).expect("pretty"));
    assert!(body["error"].is_null());
    assert_eq!(body["user_liquidity"], "2000000000000000000");
    assert_eq!(body["remove_liquidity"], "1000000000000000000");
    assert_eq!(body["can_remove"], true);

    let body = get_json(&client, &format!("/api/v1/earn/remove-preview?account={:?}", holder()));
    assert_eq!(body["remove_liquidity"], "0");
    assert_eq!(body["can_remove"], false);

    // no account and no signer
    let body = get_json(&client, "/api/v1/earn/remove-preview?percent=50");
    assert_eq!(body["can_remove"], false);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("no account")));
}

#[test]
fn test_portfolio_from_cached_snapshots() {
    let client = seeded_client();
    let body = get_json(&client, &format!("/api/v1/portfolio?account={:?}", holder()));
    assert!(body["error"].is_null());
    assert_eq!(body["wallet_usd"], "6500.00");
    assert_eq!(body["supplied_liquidity"], "2000000000000000000");
}

#[test]
fn test_unreachable_node_yields_json_error() {
    let client = client();
    let body = get_json(&client, "/api/v1/earn");
    println!("{}", serde_json::to_string_pretty(&body).expect("pretty"));
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert_eq!(body["pool_pair"], "KALA / ETH");
    assert_eq!(body["hook"]["address"], "0x3485cE0473ABcefAFF025aa7aCed6438d3d84080");
    assert_eq!(body["workflow"]["status"], "idle");

    let body = get_json(&client, "/api/v1/earn/quote?amount_eth=1");
    assert_eq!(body["eth_to_kala_rate"], "0");
    assert_eq!(body["amount_eth"], "1");
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

    let body = get_json(&client, &format!("/api/v1/portfolio?account={:?}", holder()));
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}
