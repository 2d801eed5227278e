//! The `task::enable_lightning` workflow.
//!
//! Activation is asynchronous on the daemon: `init` hands back a task id,
//! `status` is polled until the task settles, and `cancel` abandons it.
//! The poll is bounded by a [`RetryPolicy`]; once the budget is spent the
//! task is cancelled exactly once and the workflow ends in
//! [`ActivationState::TimedOut`].

use std::time::Duration;

use dex_rpc::{Method, RpcFailure, RpcResponse, RpcTransport, TransportError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::session::{balance_text, NodeSettings};

pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const ALREADY_ACTIVATED: &str = "already activated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address and spendable balance reported when activation settles `Ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivatedNode {
    pub address: Option<String>,
    pub balance: Option<String>,
    pub details: Value,
}

/// Progress of one activation attempt.
///
/// Two states mean success: [`Ok`](ActivationState::Ok) when a task ran and
/// settled with wallet details, and
/// [`AlreadyActive`](ActivationState::AlreadyActive) when `init` was refused
/// because the node already runs. Callers that only care whether a node
/// exists should use [`ActivationState::is_active`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationState {
    NotStarted,
    TaskSubmitted(TaskId),
    Polling { task: TaskId, attempt: u32 },
    Ok(ActivatedNode),
    /// Successful without a task. No wallet details are reported, so the
    /// session keeps whatever it refreshes on its own.
    AlreadyActive,
    Error(String),
    Cancelled,
    TimedOut,
}

impl ActivationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivationState::Ok(_)
                | ActivationState::AlreadyActive
                | ActivationState::Error(_)
                | ActivationState::Cancelled
                | ActivationState::TimedOut
        )
    }

    pub fn outstanding_task(&self) -> Option<TaskId> {
        match self {
            ActivationState::TaskSubmitted(task) | ActivationState::Polling { task, .. } => {
                Some(*task)
            }
            _ => None,
        }
    }

    /// Whether a lightning node exists on the daemon afterwards.
    pub fn is_active(&self) -> bool {
        matches!(self, ActivationState::Ok(_) | ActivationState::AlreadyActive)
    }
}

/// Failures after which no session can exist.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("daemon rejected lightning activation for {ticker}: {failure}")]
    Rejected { ticker: String, failure: RpcFailure },
    #[error("activation response for {ticker} carried no task_id")]
    MissingTaskId { ticker: String },
    #[error("activation task {0} is still in flight; cancel it first")]
    InFlight(TaskId),
    #[error("coin {0} not found in activation commands")]
    UnknownCoin(String),
    #[error("platform coin cannot be enabled with method {0:?}")]
    UnsupportedMethod(String),
    #[error("failed to fetch activation command: {0}")]
    Source(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Deserialize)]
struct InitResult {
    task_id: Option<TaskId>,
}

#[derive(Deserialize)]
struct StatusResult {
    status: String,
    #[serde(default)]
    details: Value,
}

/// Drives one lightning activation from `NotStarted` to a terminal state.
pub struct Activation {
    ticker: String,
    settings: NodeSettings,
    policy: RetryPolicy,
    state: ActivationState,
}

impl Activation {
    pub fn new(ticker: impl Into<String>, settings: NodeSettings, policy: RetryPolicy) -> Self {
        Self {
            ticker: ticker.into(),
            settings,
            policy,
            state: ActivationState::NotStarted,
        }
    }

    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    pub fn into_state(self) -> ActivationState {
        self.state
    }

    pub fn init_params(&self) -> Value {
        json!({
            "ticker": self.ticker,
            "activation_params": {
                "name": self.settings.name,
                "listening_port": self.settings.port,
                "color": self.settings.color,
                "payment_retries": self.settings.payment_retries,
            }
        })
    }

    /// Submit the task and poll it to completion.
    pub async fn run<T>(&mut self, rpc: &T) -> Result<&ActivationState, ActivationError>
    where
        T: RpcTransport + ?Sized,
    {
        if let Some(task) = self.state.outstanding_task() {
            return Err(ActivationError::InFlight(task));
        }

        let Some(task) = self.submit(rpc).await? else {
            return Ok(&self.state);
        };
        self.poll(rpc, task).await?;
        Ok(&self.state)
    }

    async fn submit<T>(&mut self, rpc: &T) -> Result<Option<TaskId>, ActivationError>
    where
        T: RpcTransport + ?Sized,
    {
        info!(ticker = %self.ticker, port = self.settings.port, "starting lightning activation");
        let response = rpc
            .call(Method::EnableLightningInit, self.init_params())
            .await?;

        let result = match response {
            RpcResponse::Failure(failure) if failure.contains(ALREADY_ACTIVATED) => {
                info!(ticker = %self.ticker, "lightning already activated");
                self.state = ActivationState::AlreadyActive;
                return Ok(None);
            }
            RpcResponse::Failure(failure) => {
                return Err(ActivationError::Rejected {
                    ticker: self.ticker.clone(),
                    failure,
                });
            }
            RpcResponse::Success(result) => result,
        };

        let task = serde_json::from_value::<InitResult>(result)
            .ok()
            .and_then(|init| init.task_id)
            .ok_or_else(|| ActivationError::MissingTaskId {
                ticker: self.ticker.clone(),
            })?;
        debug!(ticker = %self.ticker, %task, "activation task submitted");
        self.state = ActivationState::TaskSubmitted(task);
        Ok(Some(task))
    }

    async fn poll<T>(&mut self, rpc: &T, task: TaskId) -> Result<(), ActivationError>
    where
        T: RpcTransport + ?Sized,
    {
        for attempt in 1..=self.policy.max_attempts {
            self.state = ActivationState::Polling { task, attempt };
            let response = rpc
                .call(
                    Method::EnableLightningStatus,
                    json!({ "task_id": task.0, "forget_if_finished": false }),
                )
                .await?;

            if let Some(next) = Self::settle(response) {
                match &next {
                    ActivationState::Ok(node) => {
                        info!(ticker = %self.ticker, %task, attempt, address = ?node.address, "lightning activated")
                    }
                    other => {
                        warn!(ticker = %self.ticker, %task, attempt, state = ?other, "lightning activation ended")
                    }
                }
                self.state = next;
                return Ok(());
            }

            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        warn!(
            ticker = %self.ticker,
            %task,
            attempts = self.policy.max_attempts,
            "activation did not settle; cancelling task"
        );
        self.cancel_task(rpc, task).await?;
        self.state = ActivationState::TimedOut;
        Ok(())
    }

    /// Map one status reply to a terminal state, or `None` to keep polling.
    fn settle(response: RpcResponse) -> Option<ActivationState> {
        let result = match response {
            RpcResponse::Failure(failure) => {
                return Some(ActivationState::Error(failure.to_string()));
            }
            RpcResponse::Success(result) => result,
        };
        let Ok(status) = serde_json::from_value::<StatusResult>(result) else {
            return None;
        };
        match status.status.as_str() {
            "Ok" => {
                let address = status
                    .details
                    .get("address")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                let balance = status
                    .details
                    .get("balance")
                    .and_then(|b| b.get("spendable"))
                    .map(balance_text);
                Some(ActivationState::Ok(ActivatedNode {
                    address,
                    balance,
                    details: status.details,
                }))
            }
            "Error" => Some(ActivationState::Error(status.details.to_string())),
            "Cancelled" => Some(ActivationState::Cancelled),
            _ => None,
        }
    }

    async fn cancel_task<T>(&self, rpc: &T, task: TaskId) -> Result<(), ActivationError>
    where
        T: RpcTransport + ?Sized,
    {
        let response = rpc
            .call(Method::EnableLightningCancel, json!({ "task_id": task.0 }))
            .await?;
        if let RpcResponse::Failure(failure) = response {
            warn!(%task, error = %failure, "daemon refused to cancel activation task");
        }
        Ok(())
    }

    /// Abandon an outstanding task, e.g. after an interrupted run.
    pub async fn cancel<T>(&mut self, rpc: &T) -> Result<(), ActivationError>
    where
        T: RpcTransport + ?Sized,
    {
        if let Some(task) = self.state.outstanding_task() {
            self.cancel_task(rpc, task).await?;
            self.state = ActivationState::Cancelled;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_rpc::MockTransport;

    fn activation(policy: RetryPolicy) -> Activation {
        Activation::new("tBTC-lightning", NodeSettings::default(), policy)
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 30,
            interval: Duration::from_millis(1),
        }
    }

    fn in_progress() -> Value {
        json!({ "mmrpc": "2.0", "result": { "status": "InProgress", "details": "ActivatingCoin" }, "id": 1 })
    }

    #[test]
    fn init_params_carry_node_settings() {
        let params = activation(fast()).init_params();
        assert_eq!(params["ticker"], "tBTC-lightning");
        assert_eq!(params["activation_params"]["listening_port"], 9735);
        assert_eq!(params["activation_params"]["payment_retries"], 5);
    }

    #[tokio::test]
    async fn missing_task_id_is_fatal() {
        let mock = MockTransport::new();
        mock.enqueue(Method::EnableLightningInit, json!({ "result": {} }))
            .await;
        let err = activation(fast()).run(&*mock).await.unwrap_err();
        assert!(matches!(err, ActivationError::MissingTaskId { .. }));
    }

    #[tokio::test]
    async fn other_init_errors_are_fatal() {
        let mock = MockTransport::new();
        mock.enqueue(
            Method::EnableLightningInit,
            json!({ "error": "No such coin tBTC-segwit" }),
        )
        .await;
        let err = activation(fast()).run(&*mock).await.unwrap_err();
        assert!(matches!(err, ActivationError::Rejected { .. }));
        assert_eq!(mock.count(Method::EnableLightningStatus).await, 0);
    }

    #[tokio::test]
    async fn status_error_status_is_terminal_error() {
        let mock = MockTransport::new();
        mock.enqueue(Method::EnableLightningInit, json!({ "result": { "task_id": 3 } }))
            .await;
        mock.enqueue(Method::EnableLightningStatus, in_progress())
            .await;
        mock.enqueue(
            Method::EnableLightningStatus,
            json!({ "result": { "status": "Error", "details": { "error": "platform coin not active" } } }),
        )
        .await;

        let mut workflow = activation(fast());
        let state = workflow.run(&*mock).await.unwrap().clone();
        assert!(matches!(state, ActivationState::Error(ref msg) if msg.contains("platform coin")));
        assert_eq!(mock.count(Method::EnableLightningStatus).await, 2);
        assert_eq!(mock.count(Method::EnableLightningCancel).await, 0);
    }

    #[tokio::test]
    async fn domain_error_while_polling_is_terminal_error() {
        let mock = MockTransport::new();
        mock.enqueue(Method::EnableLightningInit, json!({ "result": { "task_id": 3 } }))
            .await;
        mock.enqueue(
            Method::EnableLightningStatus,
            json!({ "error": "No such task '3'" }),
        )
        .await;
        let mut workflow = activation(fast());
        let state = workflow.run(&*mock).await.unwrap();
        assert!(matches!(state, ActivationState::Error(_)));
    }

    #[tokio::test]
    async fn cancelled_status_is_terminal() {
        let mock = MockTransport::new();
        mock.enqueue(Method::EnableLightningInit, json!({ "result": { "task_id": 9 } }))
            .await;
        mock.enqueue(
            Method::EnableLightningStatus,
            json!({ "result": { "status": "Cancelled", "details": null } }),
        )
        .await;
        let mut workflow = activation(fast());
        assert_eq!(
            workflow.run(&*mock).await.unwrap(),
            &ActivationState::Cancelled
        );
    }

    #[tokio::test]
    async fn transport_failure_while_polling_propagates() {
        let mock = MockTransport::new();
        mock.enqueue(Method::EnableLightningInit, json!({ "result": { "task_id": 4 } }))
            .await;
        mock.enqueue_unavailable(Method::EnableLightningStatus, "connection refused")
            .await;
        let mut workflow = activation(fast());
        let err = workflow.run(&*mock).await.unwrap_err();
        assert!(matches!(err, ActivationError::Transport(_)));
        assert_eq!(workflow.state().outstanding_task(), Some(TaskId(4)));

        // A second run is refused until the handle is released.
        let err = workflow.run(&*mock).await.unwrap_err();
        assert!(matches!(err, ActivationError::InFlight(TaskId(4))));
        assert_eq!(mock.count(Method::EnableLightningInit).await, 1);

        mock.enqueue(Method::EnableLightningCancel, json!({ "result": "success" }))
            .await;
        workflow.cancel(&*mock).await.unwrap();
        assert_eq!(workflow.state(), &ActivationState::Cancelled);
        let cancels = mock.calls_to(Method::EnableLightningCancel).await;
        assert_eq!(cancels[0].params, json!({ "task_id": 4 }));
    }
}
