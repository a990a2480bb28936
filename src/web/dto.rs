use rocket::serde::{Deserialize, Serialize};

#[derive(Deserialize, rocket::FromForm)]
pub struct AccountQuery {
    pub account: Option<String>,
}

#[derive(Deserialize, rocket::FromForm)]
pub struct QuoteQuery {
    pub amount_eth: Option<String>,
    pub amount_kala: Option<String>,
}

#[derive(Deserialize, rocket::FromForm)]
pub struct RemovePreviewQuery {
    pub account: Option<String>,
    pub percent: Option<f64>,
}

#[derive(Deserialize, rocket::FromForm)]
pub struct AmountQuery {
    pub amount: Option<String>,
}

#[derive(Deserialize)]
pub struct AddLiquidityRequest {
    pub amount_eth: String,
    pub amount_kala: String,
}

#[derive(Deserialize)]
pub struct RemoveLiquidityRequest {
    pub percent: f64,
}

#[derive(Serialize, Default)]
pub struct PoolKeyDto {
    pub currency0: String,
    pub currency1: String,
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: String,
}

#[derive(Serialize, Default)]
pub struct ContractsDto {
    pub kala_money: String,
    pub kala_hook: String,
    pub pool_manager: String,
    pub state_view: String,
    pub pool_modify_liquidity_test: String,
}

#[derive(Serialize, Default)]
pub struct ConfigResponse {
    pub chain_id: u64,
    pub deployment_block: u64,
    pub contracts: ContractsDto,
    pub pool_key: PoolKeyDto,
    pub pool_id: String,
    pub legacy_pool_id: Option<String>,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub position_sources: Vec<String>,
    pub signer: Option<String>,
    pub explorer_url: String,
}

#[derive(Serialize, Default)]
pub struct HookDto {
    pub address: String,
    pub short_address: String,
    pub explorer_url: String,
    /// `None` until the hook configuration has been read.
    pub kala_oracle: Option<String>,
    pub eth_usd_feed: Option<String>,
    pub kala_token: Option<String>,
}

#[derive(Serialize, Default)]
pub struct PoolStateDto {
    pub pool_id: String,
    pub sqrt_price_x96: String,
    pub tick: i32,
    pub lp_fee: u32,
    pub protocol_fee: u32,
    pub liquidity: String,
    pub initialized: bool,
}

#[derive(Serialize, Default)]
pub struct PositionSourceDto {
    pub source: String,
    pub liquidity: String,
}

#[derive(Serialize, Default)]
pub struct EarnAccountDto {
    pub address: String,
    pub eth_balance: String,
    pub kala_balance: String,
    pub liquidity: String,
    pub eth_amount: String,
    pub kala_amount: String,
    pub positions: Vec<PositionSourceDto>,
}

#[derive(Serialize, Default)]
pub struct EarnResponse {
    pub timestamp_utc: String,
    pub pool_pair: String,
    pub oracle_price_usd: String,
    pub eth_price_usd: String,
    pub eth_to_kala_rate: String,
    pub dynamic_fee: String,
    pub fee_tier: String,
    pub hook: HookDto,
    pub pool: PoolStateDto,
    pub account: Option<EarnAccountDto>,
    pub workflow: WorkflowDto,
    pub error: Option<String>,
}

#[derive(Serialize, Default)]
pub struct QuoteResponse {
    pub amount_eth: Option<String>,
    pub amount_kala: Option<String>,
    pub eth_to_kala_rate: String,
    pub error: Option<String>,
}

#[derive(Serialize, Default)]
pub struct RemovePreviewResponse {
    pub percent: f64,
    pub user_liquidity: String,
    pub remove_liquidity: String,
    pub eth_amount: String,
    pub kala_amount: String,
    pub can_remove: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Default)]
pub struct WorkflowDto {
    pub action: Option<String>,
    pub step: String,
    pub status: String,
    pub approve_tx_hash: Option<String>,
    pub tx_hash: Option<String>,
    pub tx_hash_short: Option<String>,
    pub tx_explorer_url: Option<String>,
    pub add_button_label: String,
    pub remove_button_label: String,
    pub success_title: Option<String>,
    pub error: Option<String>,
    pub updated_at_utc: String,
}

#[derive(Serialize, Default)]
pub struct ActionResponse {
    pub accepted: bool,
    pub liquidity_delta: Option<String>,
    pub workflow: WorkflowDto,
    pub error: Option<String>,
}

#[derive(Serialize, Default)]
pub struct PortfolioResponse {
    pub timestamp_utc: String,
    pub account: String,
    pub eth_balance: String,
    pub kala_balance: String,
    pub kala_allowance: String,
    pub supplied_liquidity: String,
    pub supplied_eth: String,
    pub supplied_kala: String,
    pub supplied_usd: String,
    pub wallet_usd: String,
    pub error: Option<String>,
}

#[derive(Serialize, Default)]
pub struct AmountValidationResponse {
    pub amount: String,
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Default)]
pub struct DescribeErrorResponse {
    pub message: String,
}
