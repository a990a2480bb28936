use anyhow::{Context, Result};
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap::AppState;
use crate::models::{AccountSnapshot, PoolSnapshot};

/// Latest pool and per-account snapshots. An older snapshot never replaces a
/// newer one, whichever path (poll or request) fetched it.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    pool: Option<PoolSnapshot>,
    accounts: HashMap<Address, AccountSnapshot>,
}

impl SnapshotCache {
    pub fn pool(&self) -> Option<&PoolSnapshot> {
        self.pool.as_ref()
    }

    pub fn account(&self, account: &Address) -> Option<&AccountSnapshot> {
        self.accounts.get(account)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn store_pool(&mut self, snapshot: PoolSnapshot) -> bool {
        match &self.pool {
            Some(current) if current.fetched_at > snapshot.fetched_at => false,
            _ => {
                self.pool = Some(snapshot);
                true
            }
        }
    }

    pub fn store_account(&mut self, snapshot: AccountSnapshot) -> bool {
        match self.accounts.get(&snapshot.account) {
            Some(current) if current.fetched_at > snapshot.fetched_at => false,
            _ => {
                self.accounts.insert(snapshot.account, snapshot);
                true
            }
        }
    }
}

/// Refresh forever on a fixed interval. A failed cycle is logged and the
/// previous snapshots stay in place.
pub async fn run(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    log::info!(
        "Poller started: every {}s, {} tracked account(s)",
        interval.as_secs(),
        state.tracked_accounts.len()
    );
    loop {
        ticker.tick().await;
        if let Err(e) = poll_once(&state).await {
            log::warn!("Poll cycle failed: {:#}", e);
        }
    }
}

pub async fn poll_once(state: &AppState) -> Result<()> {
    let pool = state
        .reader
        .fetch_pool_snapshot()
        .await
        .context("Failed to refresh pool snapshot")?;
    log::debug!("Pool refreshed: tick {}, liquidity {}", pool.slot0.tick, pool.liquidity);
    state.snapshots.write().await.store_pool(pool);

    for account in &state.tracked_accounts {
        let snapshot = state
            .reader
            .fetch_account_snapshot(*account)
            .await
            .with_context(|| format!("Failed to refresh account {:?}", account))?;
        state.snapshots.write().await.store_account(snapshot);
    }
    Ok(())
}
