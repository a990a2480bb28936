use ethers::types::{Address, H256, U256};
use ethers::utils::to_checksum;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use rust_decimal::prelude::*;
use serde_json::Value;
use std::sync::Arc;

use crate::bootstrap::AppState;
use crate::chain::pool::{TICK_LOWER, TICK_UPPER};
use crate::chain::registry::{short_address, short_tx_hash, Explorer};
use crate::engine::earn::{
    compose_earn, is_valid_amount_input, parse_amount_input, plan_add, preview_remove,
    quote_paired, validate_remove, QuoteSide, FEE_TIER_LABEL, MAX_DYNAMIC_FEE_PERCENT,
    MIN_DYNAMIC_FEE_PERCENT, POOL_PAIR_LABEL,
};
use crate::engine::portfolio::compose_portfolio;
use crate::engine::workflow::{self, Action, WorkflowState};
use crate::errors::{parse_contract_error, CaughtError, ChainError};
use crate::math::units::{to_display, to_fixed, wei_to_decimal};
use crate::models::PoolSnapshot;
use crate::web::dto::*;

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn checksum(address: Address) -> String {
    to_checksum(&address, None)
}

fn hex_hash(hash: H256) -> String {
    format!("{:?}", hash)
}

/// ether-denominated wei rendered with exactly `dp` decimals
fn ether_fixed(wei: U256, dp: u32) -> String {
    to_fixed(wei_to_decimal(wei, 18), dp)
}

/// ether-denominated wei rendered with up to `dp` decimals
fn ether_display(wei: U256, dp: u32) -> String {
    to_display(wei_to_decimal(wei, 18), dp)
}

/// Account named in the query, else the configured wallet, else none.
fn resolve_account(app_state: &AppState, account: Option<&str>) -> Result<Option<Address>, ChainError> {
    match account.map(str::trim).filter(|a| !a.is_empty()) {
        Some(a) => Address::from_str(a)
            .map(Some)
            .map_err(|e| ChainError::InvalidInput(format!("invalid account '{}': {}", a, e))),
        None => Ok(app_state.default_account()),
    }
}

fn require_account(app_state: &AppState, account: Option<&str>) -> Result<Address, ChainError> {
    resolve_account(app_state, account)?
        .ok_or_else(|| ChainError::InvalidInput("no account given and no wallet configured".to_string()))
}

pub fn workflow_dto(state: &WorkflowState, explorer: &Explorer) -> WorkflowDto {
    WorkflowDto {
        action: state.action.map(|a| match a {
            Action::Add => "add".to_string(),
            Action::Remove => "remove".to_string(),
        }),
        step: state.step.as_str().to_string(),
        status: state.status.as_str().to_string(),
        approve_tx_hash: state.approve_hash.map(hex_hash),
        tx_hash: state.tx_hash.map(hex_hash),
        tx_hash_short: state.tx_hash.map(short_tx_hash),
        tx_explorer_url: state.tx_hash.map(|h| explorer.tx_url(h)),
        add_button_label: state.add_button_label().to_string(),
        remove_button_label: state.remove_button_label().to_string(),
        success_title: state.success_title().map(str::to_string),
        error: state.error_message().map(str::to_string),
        updated_at_utc: state.updated_at.to_rfc3339(),
    }
}

async fn current_workflow(app_state: &AppState) -> WorkflowDto {
    workflow_dto(&app_state.workflow.snapshot().await, &app_state.explorer)
}

fn hook_dto(app_state: &AppState, pool: Option<&PoolSnapshot>) -> HookDto {
    let hook = app_state.deployment.kala_hook;
    let config = pool.and_then(|p| p.hook);
    HookDto {
        address: checksum(hook),
        short_address: short_address(hook),
        explorer_url: app_state.explorer.address_url(hook),
        kala_oracle: config.map(|c| short_address(c.kala_oracle)),
        eth_usd_feed: config.map(|c| short_address(c.eth_usd_feed)),
        kala_token: config.map(|c| short_address(c.kala_token)),
    }
}

#[get("/api/v1/config")]
pub fn deployment_config(app_state: &State<Arc<AppState>>) -> Json<ConfigResponse> {
    let d = &app_state.deployment;
    let key = app_state.pool_key;
    Json(ConfigResponse {
        chain_id: d.chain_id,
        deployment_block: d.deployment_block,
        contracts: ContractsDto {
            kala_money: checksum(d.kala_money),
            kala_hook: checksum(d.kala_hook),
            pool_manager: checksum(d.pool_manager),
            state_view: checksum(d.state_view),
            pool_modify_liquidity_test: checksum(d.pool_modify_liquidity_test),
        },
        pool_key: PoolKeyDto {
            currency0: checksum(key.currency0),
            currency1: checksum(key.currency1),
            fee: key.fee,
            tick_spacing: key.tick_spacing,
            hooks: checksum(key.hooks),
        },
        pool_id: key.pool_id_hex(),
        legacy_pool_id: app_state.legacy_pool_key.map(|k| k.pool_id_hex()),
        tick_lower: TICK_LOWER,
        tick_upper: TICK_UPPER,
        position_sources: app_state
            .reader
            .targets()
            .position_sources
            .iter()
            .map(|s| s.to_string())
            .collect(),
        signer: app_state.default_account().map(checksum),
        explorer_url: app_state.explorer.address_url(d.kala_hook),
    })
}

async fn build_earn(app_state: &AppState, account: Option<&str>) -> Result<EarnResponse, ChainError> {
    let account = resolve_account(app_state, account)?;
    let pool = app_state.pool_snapshot().await?;
    let snapshot = match account {
        Some(a) => Some(app_state.account_snapshot(a).await?),
        None => None,
    };
    let view = compose_earn(app_state.pool_key, &pool, snapshot.as_ref())?;

    Ok(EarnResponse {
        timestamp_utc: now(),
        pool_pair: POOL_PAIR_LABEL.to_string(),
        oracle_price_usd: to_fixed(view.kala_usd, 4),
        eth_price_usd: to_fixed(view.eth_usd, 2),
        eth_to_kala_rate: to_display(view.eth_to_kala_rate, 6),
        dynamic_fee: format!("{}% - {}%", MIN_DYNAMIC_FEE_PERCENT, MAX_DYNAMIC_FEE_PERCENT),
        fee_tier: FEE_TIER_LABEL.to_string(),
        hook: hook_dto(app_state, Some(&pool)),
        pool: PoolStateDto {
            pool_id: hex_hash(view.pool_id),
            sqrt_price_x96: view.slot0.sqrt_price_x96.to_string(),
            tick: view.slot0.tick,
            lp_fee: view.slot0.lp_fee,
            protocol_fee: view.slot0.protocol_fee,
            liquidity: view.pool_liquidity.to_string(),
            initialized: view.slot0.is_initialized(),
        },
        account: view.position.map(|p| EarnAccountDto {
            address: checksum(p.account),
            eth_balance: ether_fixed(p.eth_balance, 4),
            kala_balance: ether_fixed(p.kala_balance, 2),
            liquidity: p.liquidity.to_string(),
            eth_amount: ether_display(p.eth_amount, 6),
            kala_amount: ether_display(p.kala_amount, 2),
            positions: p
                .positions
                .iter()
                .map(|r| PositionSourceDto { source: r.source.to_string(), liquidity: r.liquidity.to_string() })
                .collect(),
        }),
        workflow: current_workflow(app_state).await,
        error: None,
    })
}

#[get("/api/v1/earn?<query..>")]
pub async fn earn_view(query: AccountQuery, app_state: &State<Arc<AppState>>) -> Json<EarnResponse> {
    match build_earn(app_state, query.account.as_deref()).await {
        Ok(response) => Json(response),
        Err(e) => {
            log::error!("Failed to build earn view: {}", e);
            Json(EarnResponse {
                timestamp_utc: now(),
                pool_pair: POOL_PAIR_LABEL.to_string(),
                hook: hook_dto(app_state, None),
                workflow: current_workflow(app_state).await,
                error: Some(e.user_message()),
                ..Default::default()
            })
        }
    }
}

async fn build_quote(app_state: &AppState, query: &QuoteQuery) -> Result<QuoteResponse, ChainError> {
    let (input, side) = match (query.amount_eth.as_deref(), query.amount_kala.as_deref()) {
        (Some(eth), None) => (eth, QuoteSide::Eth),
        (None, Some(kala)) => (kala, QuoteSide::Kala),
        _ => {
            return Err(ChainError::InvalidInput(
                "exactly one of amount_eth or amount_kala is required".to_string(),
            ))
        }
    };
    let rate = app_state.pool_snapshot().await?.prices.eth_to_kala_rate();
    let quote = quote_paired(input, side, rate)?;
    Ok(QuoteResponse {
        amount_eth: quote.amount_eth,
        amount_kala: quote.amount_kala,
        eth_to_kala_rate: to_display(rate, 6),
        error: None,
    })
}

#[get("/api/v1/earn/quote?<query..>")]
pub async fn earn_quote(query: QuoteQuery, app_state: &State<Arc<AppState>>) -> Json<QuoteResponse> {
    match build_quote(app_state, &query).await {
        Ok(response) => Json(response),
        Err(e) => {
            log::error!("Failed to quote paired amount: {}", e);
            Json(QuoteResponse {
                amount_eth: query.amount_eth,
                amount_kala: query.amount_kala,
                eth_to_kala_rate: "0".to_string(),
                error: Some(e.user_message()),
            })
        }
    }
}

fn percent_decimal(percent: f64) -> Result<Decimal, ChainError> {
    Decimal::from_f64(percent).ok_or_else(|| ChainError::InvalidInput(format!("invalid percent {}", percent)))
}

async fn build_remove_preview(
    app_state: &AppState,
    query: &RemovePreviewQuery,
) -> Result<RemovePreviewResponse, ChainError> {
    let account = require_account(app_state, query.account.as_deref())?;
    let percent = query.percent.unwrap_or(0.0);
    let pool = app_state.pool_snapshot().await?;
    let snapshot = app_state.account_snapshot(account).await?;
    let preview = preview_remove(&pool.slot0, snapshot.total_liquidity(), percent_decimal(percent)?)?;

    Ok(RemovePreviewResponse {
        percent,
        user_liquidity: preview.user_liquidity.to_string(),
        remove_liquidity: preview.remove_liquidity.to_string(),
        eth_amount: ether_display(preview.eth_wei, 6),
        kala_amount: ether_display(preview.kala_wei, 2),
        can_remove: percent > 0.0 && preview.user_liquidity > 0,
        error: None,
    })
}

#[get("/api/v1/earn/remove-preview?<query..>")]
pub async fn earn_remove_preview(
    query: RemovePreviewQuery,
    app_state: &State<Arc<AppState>>,
) -> Json<RemovePreviewResponse> {
    match build_remove_preview(app_state, &query).await {
        Ok(response) => Json(response),
        Err(e) => {
            log::error!("Failed to preview removal: {}", e);
            Json(RemovePreviewResponse {
                percent: query.percent.unwrap_or(0.0),
                user_liquidity: "0".to_string(),
                remove_liquidity: "0".to_string(),
                eth_amount: "0".to_string(),
                kala_amount: "0".to_string(),
                can_remove: false,
                error: Some(e.user_message()),
            })
        }
    }
}

async fn action_response(app_state: &AppState, result: Result<String, ChainError>) -> Json<ActionResponse> {
    let workflow = current_workflow(app_state).await;
    match result {
        Ok(delta) => Json(ActionResponse { accepted: true, liquidity_delta: Some(delta), workflow, error: None }),
        Err(e) => {
            log::error!("Liquidity action rejected: {}", e);
            Json(ActionResponse { accepted: false, liquidity_delta: None, workflow, error: Some(e.user_message()) })
        }
    }
}

#[post("/api/v1/earn/add", format = "json", data = "<request>")]
pub async fn earn_add(request: Json<AddLiquidityRequest>, app_state: &State<Arc<AppState>>) -> Json<ActionResponse> {
    let result = async {
        let client = app_state.signer()?;
        let pool = app_state.pool_snapshot().await?;
        let plan = plan_add(&request.amount_eth, &request.amount_kala, Some(&pool.slot0))?;
        let delta = plan.liquidity_delta.to_string();
        log::info!(
            "Add liquidity requested: {} ETH, {} KALA, delta {}",
            request.amount_eth,
            request.amount_kala,
            delta
        );
        workflow::start_add(&app_state.workflow, client, plan).await?;
        Ok::<String, ChainError>(delta)
    }
    .await;
    action_response(app_state, result).await
}

#[post("/api/v1/earn/remove", format = "json", data = "<request>")]
pub async fn earn_remove(
    request: Json<RemoveLiquidityRequest>,
    app_state: &State<Arc<AppState>>,
) -> Json<ActionResponse> {
    let result = async {
        let client = app_state.signer()?;
        let snapshot = app_state.reader.fetch_account_snapshot(client.account()).await?;
        let liquidity = validate_remove(
            percent_decimal(request.percent)?,
            &num_bigint::BigInt::from(snapshot.total_liquidity()),
        )?;
        app_state.remember_account(snapshot).await;
        let delta = format!("-{}", liquidity);
        log::info!("Remove liquidity requested: {}% -> delta {}", request.percent, delta);
        workflow::start_remove(&app_state.workflow, client, liquidity).await?;
        Ok::<String, ChainError>(delta)
    }
    .await;
    action_response(app_state, result).await
}

#[get("/api/v1/earn/status")]
pub async fn earn_status(app_state: &State<Arc<AppState>>) -> Json<WorkflowDto> {
    Json(current_workflow(app_state).await)
}

async fn build_portfolio(app_state: &AppState, account: Option<&str>) -> Result<PortfolioResponse, ChainError> {
    let account = require_account(app_state, account)?;
    let pool = app_state.pool_snapshot().await?;
    let snapshot = app_state.account_snapshot(account).await?;
    let view = compose_portfolio(&pool, &snapshot)?;
    Ok(PortfolioResponse {
        timestamp_utc: now(),
        account: checksum(view.account),
        eth_balance: ether_fixed(view.eth_balance, 4),
        kala_balance: ether_fixed(view.kala_balance, 2),
        kala_allowance: ether_display(view.kala_allowance, 6),
        supplied_liquidity: view.liquidity.to_string(),
        supplied_eth: ether_display(view.supplied_eth, 6),
        supplied_kala: ether_display(view.supplied_kala, 2),
        supplied_usd: to_fixed(view.supplied_usd, 2),
        wallet_usd: to_fixed(view.wallet_usd, 2),
        error: None,
    })
}

#[get("/api/v1/portfolio?<query..>")]
pub async fn portfolio(query: AccountQuery, app_state: &State<Arc<AppState>>) -> Json<PortfolioResponse> {
    match build_portfolio(app_state, query.account.as_deref()).await {
        Ok(response) => Json(response),
        Err(e) => {
            log::error!("Failed to build portfolio: {}", e);
            Json(PortfolioResponse {
                timestamp_utc: now(),
                account: query.account.unwrap_or_default(),
                error: Some(e.user_message()),
                ..Default::default()
            })
        }
    }
}

/// Shared amount check for the withdraw form: digits with one optional point.
pub fn validate_amount(amount: &str) -> AmountValidationResponse {
    let error = if !is_valid_amount_input(amount) {
        Some("Amount may only contain digits and a single decimal point".to_string())
    } else if !amount.is_empty() && parse_amount_input(amount).is_none() {
        Some("Amount is incomplete".to_string())
    } else {
        None
    };
    AmountValidationResponse { amount: amount.to_string(), valid: error.is_none(), error }
}

#[get("/api/v1/withdraw/validate?<query..>")]
pub fn withdraw_validate(query: AmountQuery) -> Json<AmountValidationResponse> {
    Json(validate_amount(query.amount.as_deref().unwrap_or("")))
}

#[post("/api/v1/errors/describe", format = "json", data = "<failure>")]
pub fn describe_error(failure: Json<Value>) -> Json<DescribeErrorResponse> {
    let caught = CaughtError::from_json(&failure);
    Json(DescribeErrorResponse { message: parse_contract_error(caught.as_ref()) })
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
