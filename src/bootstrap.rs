use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ethers::prelude::*;
use tokio::sync::RwLock;

use crate::chain::liquidity_client::LiquidityClient;
use crate::chain::pool::PoolKey;
use crate::chain::providers::{self, SignerClient};
use crate::chain::registry::{AddressOverrides, Deployment, Explorer};
use crate::chain::state_reader::{ReadTargets, StateReader};
use crate::config::Config;
use crate::engine::poller::SnapshotCache;
use crate::engine::workflow::Workflow;
use crate::errors::ChainError;
use crate::models::{parse_position_sources, AccountSnapshot, PoolSnapshot};

pub struct AppState {
    pub reader: StateReader<Provider<Http>>,
    /// Present only when a wallet key is configured.
    pub writer: Option<Arc<LiquidityClient<SignerClient>>>,
    pub deployment: Deployment,
    pub pool_key: PoolKey,
    pub legacy_pool_key: Option<PoolKey>,
    pub tracked_accounts: Vec<Address>,
    pub snapshots: Arc<RwLock<SnapshotCache>>,
    pub workflow: Workflow,
    pub explorer: Explorer,
    pub poll_interval: Duration,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let provider = providers::create_provider(&config.rpc_url)?;

        let overrides = AddressOverrides {
            kala_money: parse_optional(&config.kala_money_address)?,
            kala_hook: parse_optional(&config.kala_hook_address)?,
            pool_manager: parse_optional(&config.pool_manager_address)?,
            state_view: parse_optional(&config.state_view_address)?,
            pool_modify_liquidity_test: parse_optional(&config.pool_modify_liquidity_test_address)?,
        };
        let deployment = Deployment::for_chain(config.chain_id)
            .ok_or_else(|| format!("No deployment known for chain id {}", config.chain_id))?
            .with_overrides(&overrides);

        let pool_key = PoolKey::kala_pool(deployment.kala_money, deployment.kala_hook);
        let legacy_pool_key = parse_optional(&config.kala_legacy_hook_address)?
            .map(|hook| PoolKey::kala_pool(deployment.kala_money, hook));

        let position_sources = parse_position_sources(&config.position_sources)?;
        let targets = ReadTargets {
            deployment: deployment.clone(),
            pool_key,
            legacy_pool_key,
            position_sources,
            multicall: parse_optional(&config.multicall_address)?,
        };
        let reader = StateReader::new(provider.clone(), targets);

        let writer = match &config.wallet_private_key {
            Some(key) => {
                let signer = providers::create_signer(provider.clone(), key, config.chain_id)?;
                let account = signer.address();
                Some(Arc::new(LiquidityClient::new(signer, account, &deployment, pool_key)))
            }
            None => {
                log::warn!("WALLET_PRIVATE_KEY not set; add/remove endpoints are disabled");
                None
            }
        };

        let tracked_accounts = config
            .tracked_accounts
            .iter()
            .map(|a| Address::from_str(a))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Chain {} pool {} (hook {:?})",
            deployment.chain_id,
            pool_key.pool_id_hex(),
            deployment.kala_hook
        );

        Ok(AppState {
            reader,
            writer,
            deployment,
            pool_key,
            legacy_pool_key,
            tracked_accounts,
            snapshots: Arc::new(RwLock::new(SnapshotCache::default())),
            workflow: Workflow::new(),
            explorer: Explorer::new(&config.explorer_url)?,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    /// Account to show when a request names none: the configured wallet.
    pub fn default_account(&self) -> Option<Address> {
        self.writer.as_ref().map(|w| w.account())
    }

    pub fn signer(&self) -> Result<Arc<LiquidityClient<SignerClient>>, ChainError> {
        self.writer.clone().ok_or(ChainError::SignerUnavailable)
    }

    /// Cached pool snapshot if one exists, otherwise a fresh read.
    pub async fn pool_snapshot(&self) -> Result<PoolSnapshot, ChainError> {
        if let Some(pool) = self.snapshots.read().await.pool() {
            return Ok(pool.clone());
        }
        let pool = self.reader.fetch_pool_snapshot().await?;
        self.snapshots.write().await.store_pool(pool.clone());
        Ok(pool)
    }

    /// Accounts whose snapshots are kept between requests: the tracked ones
    /// and the signer. Anything else is read fresh every time.
    pub fn caches_account(&self, account: &Address) -> bool {
        self.tracked_accounts.contains(account) || self.default_account().as_ref() == Some(account)
    }

    /// Store `snapshot` if its account is cached. Returns whether it was stored.
    pub async fn remember_account(&self, snapshot: AccountSnapshot) -> bool {
        if !self.caches_account(&snapshot.account) {
            return false;
        }
        self.snapshots.write().await.store_account(snapshot)
    }

    /// Cached account snapshot if younger than one poll interval, otherwise
    /// a fresh read.
    pub async fn account_snapshot(&self, account: Address) -> Result<AccountSnapshot, ChainError> {
        if let Some(snapshot) = self.snapshots.read().await.account(&account) {
            let age = Utc::now().signed_duration_since(snapshot.fetched_at);
            if age.num_seconds() < self.poll_interval.as_secs() as i64 {
                return Ok(snapshot.clone());
            }
        }
        let snapshot = self.reader.fetch_account_snapshot(account).await?;
        self.remember_account(snapshot.clone()).await;
        Ok(snapshot)
    }
}

fn parse_optional(value: &Option<String>) -> Result<Option<Address>, Box<dyn std::error::Error>> {
    value
        .as_deref()
        .map(|s| {
            Address::from_str(s).map_err(|e| {
                Box::<dyn std::error::Error>::from(format!("invalid address '{}': {}", s, e))
            })
        })
        .transpose()
}
