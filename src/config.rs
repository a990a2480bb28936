use std::env;

use crate::chain::registry::SEPOLIA_CHAIN_ID;

pub const DEFAULT_POSITION_SOURCES: &str = "harness,account,harness@legacy";
pub const DEFAULT_EXPLORER_URL: &str = "https://sepolia.etherscan.io/";

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub wallet_private_key: Option<String>,
    pub chain_id: u64,
    pub port: u16,

    // Contract address overrides (built-in registry otherwise)
    pub kala_money_address: Option<String>,
    pub kala_hook_address: Option<String>,
    pub state_view_address: Option<String>,
    pub pool_modify_liquidity_test_address: Option<String>,
    pub pool_manager_address: Option<String>,
    pub kala_legacy_hook_address: Option<String>,
    pub multicall_address: Option<String>,

    // Reads
    pub position_sources: String,
    pub tracked_accounts: Vec<String>,
    pub poll_interval_secs: u64,

    pub explorer_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load configuration files (secrets first, then public config)
        dotenv::from_filename("secrets.env").ok();
        dotenv::from_filename("addresses.env").ok();
        dotenv::from_filename("config/addresses.env").ok();
        dotenv::dotenv().ok();

        Ok(Config {
            rpc_url: env::var("SEPOLIA_RPC_URL")
                .map_err(|_| "SEPOLIA_RPC_URL must be set")?,
            wallet_private_key: optional("WALLET_PRIVATE_KEY"),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| SEPOLIA_CHAIN_ID.to_string())
                .parse()
                .map_err(|_| "CHAIN_ID must be an integer")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),

            kala_money_address: optional("KALA_MONEY_ADDRESS"),
            kala_hook_address: optional("KALA_HOOK_ADDRESS"),
            state_view_address: optional("STATE_VIEW_ADDRESS"),
            pool_modify_liquidity_test_address: optional("POOL_MODIFY_LIQUIDITY_TEST_ADDRESS"),
            pool_manager_address: optional("POOL_MANAGER_ADDRESS"),
            kala_legacy_hook_address: optional("KALA_LEGACY_HOOK_ADDRESS"),
            multicall_address: optional("MULTICALL_ADDRESS"),

            position_sources: env::var("POSITION_SOURCES")
                .unwrap_or_else(|_| DEFAULT_POSITION_SOURCES.to_string()),
            tracked_accounts: env::var("TRACKED_ACCOUNTS")
                .map(|list| split_list(&list))
                .unwrap_or_default(),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "12".to_string()).parse::<u64>().unwrap_or(12).max(1),

            explorer_url: env::var("EXPLORER_URL")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_URL.to_string()),
        })
    }
}

/// Unset and blank variables are both treated as absent.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
