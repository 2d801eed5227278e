use std::time::Duration;

use dex_lightning::node::activation::{
    Activation, ActivationError, ActivationState, RetryPolicy, TaskId,
};
use dex_lightning::node::platform::StaticActivationSource;
use dex_lightning::node::session::NodeSettings;
use dex_lightning::node::LightningNode;
use dex_rpc::{Method, MockTransport};
use serde_json::{json, Value};

fn versioned(result: Value) -> Value {
    json!({ "mmrpc": "2.0", "result": result, "id": 1 })
}

fn in_progress() -> Value {
    versioned(json!({ "status": "InProgress", "details": "ConnectingToNode" }))
}

fn task_started(task_id: u64) -> Value {
    versioned(json!({ "task_id": task_id }))
}

fn electrum_command() -> StaticActivationSource {
    StaticActivationSource(json!({
        "coin": "tBTC",
        "method": "electrum",
        "servers": [{ "url": "electrum3.cipig.net:10068" }],
    }))
}

#[tokio::test(start_paused = true)]
async fn never_settling_task_is_cancelled_once() {
    let mock = MockTransport::new();
    mock.enqueue(Method::EnableLightningInit, task_started(7)).await;
    mock.repeat(Method::EnableLightningStatus, in_progress()).await;
    mock.enqueue(Method::EnableLightningCancel, versioned(json!("success")))
        .await;

    let started = tokio::time::Instant::now();
    let mut activation = Activation::new(
        "tBTC-lightning",
        NodeSettings::default(),
        RetryPolicy::default(),
    );
    let state = activation.run(&mock).await.unwrap().clone();

    assert_eq!(state, ActivationState::TimedOut);
    assert_eq!(mock.count(Method::EnableLightningStatus).await, 30);
    let cancels = mock.calls_to(Method::EnableLightningCancel).await;
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].params["task_id"], 7);
    // 29 sleeps between 30 polls
    assert_eq!(started.elapsed(), Duration::from_secs(58));
}

#[tokio::test(start_paused = true)]
async fn already_activated_skips_polling() {
    let mock = MockTransport::new();
    mock.enqueue(
        Method::EnableLightningInit,
        json!({
            "mmrpc": "2.0",
            "error": "Coin tBTC-lightning is already activated",
            "error_type": "CoinIsAlreadyActivated",
            "id": 1,
        }),
    )
    .await;

    let mut activation = Activation::new(
        "tBTC-lightning",
        NodeSettings::default(),
        RetryPolicy::default(),
    );
    let state = activation.run(&mock).await.unwrap();

    assert_eq!(*state, ActivationState::AlreadyActive);
    assert!(state.is_active());
    assert_eq!(mock.count(Method::EnableLightningStatus).await, 0);
    assert_eq!(mock.count(Method::EnableLightningCancel).await, 0);
}

#[tokio::test(start_paused = true)]
async fn other_init_errors_are_fatal() {
    let mock = MockTransport::new();
    mock.enqueue(
        Method::EnableLightningInit,
        json!({ "mmrpc": "2.0", "error": "Platform coin tBTC-segwit is not activated", "id": 1 }),
    )
    .await;

    let mut activation = Activation::new(
        "tBTC-lightning",
        NodeSettings::default(),
        RetryPolicy::default(),
    );
    let err = activation.run(&mock).await.unwrap_err();
    assert!(matches!(err, ActivationError::Rejected { ticker, .. } if ticker == "tBTC-lightning"));
    assert_eq!(mock.count(Method::EnableLightningStatus).await, 0);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_while_polling_is_fatal() {
    let mock = MockTransport::new();
    mock.enqueue(Method::EnableLightningInit, task_started(3)).await;
    mock.enqueue(Method::EnableLightningStatus, in_progress()).await;
    mock.enqueue_unavailable(Method::EnableLightningStatus, "daemon went away")
        .await;

    let mut activation = Activation::new(
        "tBTC-lightning",
        NodeSettings::default(),
        RetryPolicy::default(),
    );
    let err = activation.run(&mock).await.unwrap_err();
    assert!(matches!(err, ActivationError::Transport(_)));
    assert_eq!(
        activation.state(),
        &ActivationState::Polling {
            task: TaskId(3),
            attempt: 2
        }
    );

    let again = activation.run(&mock).await.unwrap_err();
    assert!(matches!(again, ActivationError::InFlight(TaskId(3))));

    mock.enqueue(Method::EnableLightningCancel, versioned(json!("success")))
        .await;
    activation.cancel(&mock).await.unwrap();
    assert_eq!(activation.state(), &ActivationState::Cancelled);
    assert_eq!(mock.count(Method::EnableLightningCancel).await, 1);
}

#[tokio::test(start_paused = true)]
async fn node_activation_stores_settled_wallet() {
    let mock = MockTransport::new();
    mock.enqueue(
        Method::Electrum,
        json!({ "result": "success", "address": "tb1qplatform", "balance": "0.01", "coin": "tBTC-segwit" }),
    )
    .await;
    mock.enqueue(
        Method::GetPublicKey,
        versioned(json!({ "public_key": "02c1b9e2" })),
    )
    .await;
    mock.enqueue(Method::EnableLightningInit, task_started(11)).await;
    mock.enqueue(Method::EnableLightningStatus, in_progress()).await;
    mock.enqueue(Method::EnableLightningStatus, in_progress()).await;
    mock.enqueue(
        Method::EnableLightningStatus,
        versioned(json!({
            "status": "Ok",
            "details": {
                "platform_coin": "tBTC-segwit",
                "address": "02c1b9e2",
                "balance": { "spendable": "0.00042", "unspendable": "0" },
            }
        })),
    )
    .await;

    let (node, state) = LightningNode::activate(
        mock.clone(),
        &electrum_command(),
        "tBTC",
        NodeSettings::default(),
        RetryPolicy::default(),
    )
    .await
    .unwrap();

    assert!(matches!(state, ActivationState::Ok(_)));
    assert_eq!(mock.count(Method::EnableLightningStatus).await, 3);
    assert_eq!(mock.count(Method::EnableLightningCancel).await, 0);

    let electrum = mock.calls_to(Method::Electrum).await;
    assert_eq!(electrum[0].params["coin"], "tBTC-segwit");

    let session = node.session();
    assert_eq!(session.public_key.as_deref(), Some("02c1b9e2"));
    let lightning = session.lightning.as_ref().unwrap();
    assert_eq!(lightning.address, "02c1b9e2");
    assert_eq!(lightning.balance, "0.00042");
}

#[tokio::test(start_paused = true)]
async fn node_already_running_is_active_without_wallet() {
    let mock = MockTransport::new();
    mock.enqueue(Method::Electrum, json!({ "result": "success" }))
        .await;
    mock.enqueue(
        Method::GetPublicKey,
        versioned(json!({ "public_key": "02c1b9e2" })),
    )
    .await;
    mock.enqueue(
        Method::EnableLightningInit,
        json!({
            "mmrpc": "2.0",
            "error": "Coin tBTC-lightning is already activated",
            "error_type": "CoinIsAlreadyActivated",
            "id": 1,
        }),
    )
    .await;

    let (node, state) = LightningNode::activate(
        mock.clone(),
        &electrum_command(),
        "tBTC",
        NodeSettings::default(),
        RetryPolicy::default(),
    )
    .await
    .unwrap();

    assert_eq!(state, ActivationState::AlreadyActive);
    assert!(state.is_active());
    assert!(node.session().lightning.is_none());
    assert_eq!(node.session().public_key.as_deref(), Some("02c1b9e2"));
    assert_eq!(mock.count(Method::EnableLightningStatus).await, 0);
}

#[tokio::test(start_paused = true)]
async fn task_based_platform_command_is_refused() {
    let mock = MockTransport::new();
    let source = StaticActivationSource(json!({
        "coin": "tBTC",
        "method": "task::enable_utxo::init",
        "activation_params": { "mode": { "rpc": "Electrum" } },
    }));

    let err = LightningNode::activate(
        mock.clone(),
        &source,
        "tBTC",
        NodeSettings::default(),
        RetryPolicy::default(),
    )
    .await
    .err()
    .unwrap();

    assert!(
        matches!(err, ActivationError::UnsupportedMethod(ref m) if m == "task::enable_utxo::init")
    );
    assert!(mock.calls().await.is_empty());
}
