use chrono::{DateTime, Utc};
use ethers::providers::Middleware;
use ethers::types::{H256, I256, U256};
use num_bigint::BigInt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::chain::liquidity_client::LiquidityClient;
use crate::engine::earn::AddPlan;
use crate::errors::ChainError;
use crate::math::units::bigint_to_i256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Idle,
    Approve,
    Add,
    Remove,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::Approve => "approve",
            Step::Add => "add",
            Step::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Idle,
    Pending,
    Confirming,
    Success,
    Failed(String),
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Idle => "idle",
            TxStatus::Pending => "pending",
            TxStatus::Confirming => "confirming",
            TxStatus::Success => "success",
            TxStatus::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub action: Option<Action>,
    pub step: Step,
    pub status: TxStatus,
    pub approve_hash: Option<H256>,
    pub tx_hash: Option<H256>,
    pub updated_at: DateTime<Utc>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState {
            action: None,
            step: Step::Idle,
            status: TxStatus::Idle,
            approve_hash: None,
            tx_hash: None,
            updated_at: Utc::now(),
        }
    }
}

impl WorkflowState {
    pub fn is_busy(&self) -> bool {
        self.step != Step::Idle
    }

    pub fn add_button_label(&self) -> &'static str {
        match (self.step, &self.status, self.action) {
            (Step::Approve, _, _) => "Approving KALA...",
            (Step::Add, _, _) => "Adding Liquidity...",
            (_, TxStatus::Confirming, Some(Action::Add)) => "Confirming...",
            _ => "Provide Liquidity",
        }
    }

    pub fn remove_button_label(&self) -> &'static str {
        match (self.step, &self.status, self.action) {
            (_, TxStatus::Confirming, Some(Action::Remove)) => "Confirming...",
            (Step::Remove, _, _) => "Removing Liquidity...",
            _ => "Remove Liquidity",
        }
    }

    /// Heading of the success notice, once the final transaction is mined.
    pub fn success_title(&self) -> Option<&'static str> {
        match (&self.status, self.action) {
            (TxStatus::Success, Some(Action::Add)) => Some("Liquidity Added!"),
            (TxStatus::Success, Some(Action::Remove)) => Some("Liquidity Removed!"),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Shared lifecycle cell. Only one add or remove runs at a time.
#[derive(Clone, Default)]
pub struct Workflow {
    state: Arc<RwLock<WorkflowState>>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> WorkflowState {
        self.state.read().await.clone()
    }

    pub async fn begin(&self, action: Action) -> Result<(), ChainError> {
        let mut state = self.state.write().await;
        if state.is_busy() {
            return Err(ChainError::WorkflowBusy(state.step.as_str().to_string()));
        }
        *state = WorkflowState {
            action: Some(action),
            step: match action {
                Action::Add => Step::Approve,
                Action::Remove => Step::Remove,
            },
            status: TxStatus::Pending,
            ..WorkflowState::default()
        };
        Ok(())
    }

    pub async fn advance(&self, step: Step) {
        let mut state = self.state.write().await;
        state.step = step;
        state.status = TxStatus::Pending;
        state.updated_at = Utc::now();
    }

    pub async fn submitted(&self, hash: H256) {
        let mut state = self.state.write().await;
        if state.step == Step::Approve {
            state.approve_hash = Some(hash);
        } else {
            state.tx_hash = Some(hash);
        }
        state.status = TxStatus::Confirming;
        state.updated_at = Utc::now();
    }

    pub async fn succeeded(&self, hash: H256) {
        let mut state = self.state.write().await;
        state.tx_hash = Some(hash);
        state.step = Step::Idle;
        state.status = TxStatus::Success;
        state.updated_at = Utc::now();
    }

    pub async fn fail(&self, err: &ChainError) {
        let mut state = self.state.write().await;
        state.step = Step::Idle;
        state.status = TxStatus::Failed(err.user_message());
        state.updated_at = Utc::now();
    }
}

/// Reserve the workflow and run approve then add in the background.
pub async fn start_add<M: Middleware + 'static>(
    workflow: &Workflow,
    client: Arc<LiquidityClient<M>>,
    plan: AddPlan,
) -> Result<(), ChainError> {
    workflow.begin(Action::Add).await?;
    let workflow = workflow.clone();
    tokio::spawn(async move {
        if let Err(e) = drive_add(&workflow, &client, &plan).await {
            log::error!("Add liquidity failed: {}", e);
            workflow.fail(&e).await;
        }
    });
    Ok(())
}

/// Approve then add. A failed approve stops here: nothing else is sent.
async fn drive_add<M: Middleware + 'static>(
    workflow: &Workflow,
    client: &LiquidityClient<M>,
    plan: &AddPlan,
) -> Result<(), ChainError> {
    let approve_hash = client.submit_approve(plan.kala_wei).await?;
    workflow.submitted(approve_hash).await;
    client.wait_for_receipt(approve_hash).await?;

    workflow.advance(Step::Add).await;
    let hash = client
        .submit_modify_liquidity(plan.liquidity_delta, plan.eth_wei)
        .await?;
    workflow.submitted(hash).await;
    client.wait_for_receipt(hash).await?;
    workflow.succeeded(hash).await;
    Ok(())
}

/// Reserve the workflow and withdraw `liquidity` in the background.
pub async fn start_remove<M: Middleware + 'static>(
    workflow: &Workflow,
    client: Arc<LiquidityClient<M>>,
    liquidity: BigInt,
) -> Result<(), ChainError> {
    let delta: I256 = bigint_to_i256(&-liquidity)?;
    workflow.begin(Action::Remove).await?;
    let workflow = workflow.clone();
    tokio::spawn(async move {
        let result = async {
            let hash = client.submit_modify_liquidity(delta, U256::zero()).await?;
            workflow.submitted(hash).await;
            client.wait_for_receipt(hash).await?;
            workflow.succeeded(hash).await;
            Ok::<(), ChainError>(())
        }
        .await;
        if let Err(e) = result {
            log::error!("Remove liquidity failed: {}", e);
            workflow.fail(&e).await;
        }
    });
    Ok(())
}
