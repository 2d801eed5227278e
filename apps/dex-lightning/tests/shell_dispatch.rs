use std::sync::Arc;
use std::time::Duration;

use dex_lightning::node::activation::RetryPolicy;
use dex_lightning::node::platform::StaticActivationSource;
use dex_lightning::node::session::{NodeSession, NodeSettings};
use dex_lightning::node::LightningNode;
use dex_lightning::shell::{Shell, ShellOptions};
use dex_rpc::{Method, MockTransport};
use serde_json::{json, Value};

type TestShell = Shell<Arc<MockTransport>, StaticActivationSource, &'static [u8], Vec<u8>>;

fn options() -> ShellOptions {
    ShellOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(10),
        },
        ..ShellOptions::default()
    }
}

fn source() -> StaticActivationSource {
    StaticActivationSource(json!({ "coin": "tBTC", "method": "electrum", "servers": [] }))
}

fn shell(mock: &Arc<MockTransport>, input: &'static str) -> TestShell {
    Shell::new(mock.clone(), source(), options(), input.as_bytes(), Vec::new())
}

fn with_node(mock: &Arc<MockTransport>, input: &'static str) -> TestShell {
    let session = NodeSession::new("tBTC", NodeSettings::default());
    shell(mock, input).with_node(LightningNode::from_parts(mock.clone(), session))
}

fn versioned(result: Value) -> Value {
    json!({ "mmrpc": "2.0", "result": result, "id": 1 })
}

async fn script_refresh(mock: &MockTransport) {
    mock.repeat(
        Method::GetPublicKey,
        versioned(json!({ "public_key": "02c1b9e2" })),
    )
    .await;
    mock.repeat(
        Method::MyBalance,
        json!({ "address": "tb1qexample", "balance": "0.001", "coin": "tBTC-segwit" }),
    )
    .await;
}

fn output(shell: TestShell) -> String {
    String::from_utf8(shell.into_output()).unwrap()
}

#[tokio::test]
async fn invalid_choice_invokes_nothing() {
    let mock = MockTransport::new();
    let mut shell = shell(&mock, "99\n\n18\n");
    shell.run().await.unwrap();

    let out = output(shell);
    assert!(out.contains("Invalid menu option!"));
    assert!(out.contains("Exiting TUI"));
    assert!(mock.calls().await.is_empty());
}

#[tokio::test]
async fn undecodable_choice_is_rejected_like_any_other() {
    let mock = MockTransport::new();
    let input: &'static [u8] = b"\xff\xfe\n\n18\n";
    let mut shell: TestShell = Shell::new(mock.clone(), source(), options(), input, Vec::new());
    shell.run().await.unwrap();

    let out = output(shell);
    assert!(out.contains("Invalid menu option!"));
    assert!(out.contains("Exiting TUI"));
    assert!(mock.calls().await.is_empty());
}

#[tokio::test]
async fn node_operations_require_initialization() {
    let mock = MockTransport::new();
    let mut shell = shell(&mock, "4\n\n7\n\n18\n");
    shell.run().await.unwrap();

    let out = output(shell);
    assert_eq!(out.matches("Please initialize lightning first").count(), 2 + 3);
    assert!(mock.calls().await.is_empty());
}

#[tokio::test]
async fn end_of_input_ends_the_loop() {
    let mock = MockTransport::new();
    let mut shell = shell(&mock, "15\n");
    shell.run().await.unwrap();
    assert!(output(shell).contains("1ml.com"));
}

#[tokio::test]
async fn transport_error_is_shown_and_loop_continues() {
    let mock = MockTransport::new();
    script_refresh(&mock).await;
    mock.enqueue_unavailable(Method::ListOpenChannels, "connection refused")
        .await;
    mock.enqueue(
        Method::ListOpenChannels,
        versioned(json!({ "open_channels": [] })),
    )
    .await;

    let mut shell = with_node(&mock, "7\n\n7\n\n18\n");
    shell.run().await.unwrap();

    let calls = mock.calls_to(Method::ListOpenChannels).await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].params, json!({ "coin": "tBTC-lightning" }));

    let session = shell.node().unwrap().session().clone();
    assert_eq!(session.public_key.as_deref(), Some("02c1b9e2"));
    assert_eq!(session.platform.unwrap().address, "tb1qexample");

    let out = output(shell);
    assert!(out.contains("Error: "));
    assert!(out.contains("connection refused"));
    assert!(out.contains("open_channels"));
}

#[tokio::test]
async fn open_channel_with_max_amount() {
    let mock = MockTransport::new();
    script_refresh(&mock).await;
    mock.enqueue(
        Method::OpenChannel,
        versioned(json!({ "uuid": "4b2f", "node_id": "0388" })),
    )
    .await;

    let mut shell = with_node(&mock, "5\n\nmax\n\n18\n");
    shell.run().await.unwrap();

    let calls = mock.calls_to(Method::OpenChannel).await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].params["amount"], json!({ "type": "Max" }));
    assert!(calls[0].params["node_address"]
        .as_str()
        .unwrap()
        .ends_with("@203.132.94.196:9735"));
}

#[tokio::test]
async fn domain_failure_is_displayed() {
    let mock = MockTransport::new();
    script_refresh(&mock).await;
    mock.enqueue(
        Method::AddTrustedNode,
        json!({ "mmrpc": "2.0", "error": "Invalid node id", "error_type": "InvalidRequest", "id": 1 }),
    )
    .await;

    let mut shell = with_node(&mock, "2\nnot-a-key\n\n18\n");
    shell.run().await.unwrap();

    let calls = mock.calls_to(Method::AddTrustedNode).await;
    assert_eq!(calls[0].params["node_id"], "not-a-key");
    assert!(output(shell).contains("Invalid node id"));
}

#[tokio::test(start_paused = true)]
async fn initialize_keeps_activated_node() {
    let mock = MockTransport::new();
    script_refresh(&mock).await;
    mock.enqueue(
        Method::Electrum,
        json!({ "result": "success", "address": "tb1qexample", "balance": "0.001" }),
    )
    .await;
    mock.enqueue(
        Method::EnableLightningInit,
        versioned(json!({ "task_id": 1 })),
    )
    .await;
    mock.enqueue(
        Method::EnableLightningStatus,
        versioned(json!({
            "status": "Ok",
            "details": { "address": "02c1b9e2", "balance": { "spendable": "0" } }
        })),
    )
    .await;

    // coin, port, name, color, then continue and exit
    let mut shell = shell(&mock, "0\nDOGE\ntBTC\n9736\n\n\n\n18\n");
    shell.run().await.unwrap();

    let node = shell.node().unwrap();
    assert_eq!(node.session().lightning_ticker(), "tBTC-lightning");
    assert_eq!(node.session().settings.port, 9736);
    let init = mock.calls_to(Method::EnableLightningInit).await;
    assert_eq!(init[0].params["activation_params"]["listening_port"], 9736);

    let out = output(shell);
    assert!(out.contains("Invalid coin selection"));
    assert!(out.contains("tBTC-lightning is active."));
}

#[tokio::test(start_paused = true)]
async fn timed_out_activation_leaves_shell_uninitialized() {
    let mock = MockTransport::new();
    script_refresh(&mock).await;
    mock.enqueue(Method::Electrum, json!({ "result": "success" }))
        .await;
    mock.enqueue(
        Method::EnableLightningInit,
        versioned(json!({ "task_id": 2 })),
    )
    .await;
    mock.repeat(
        Method::EnableLightningStatus,
        versioned(json!({ "status": "InProgress", "details": "ActivatingCoin" })),
    )
    .await;
    mock.enqueue(Method::EnableLightningCancel, versioned(json!("success")))
        .await;

    let mut shell = shell(&mock, "0\n\n\n\n\n\n18\n");
    shell.run().await.unwrap();

    assert!(shell.node().is_none());
    assert_eq!(mock.count(Method::EnableLightningStatus).await, 3);
    assert_eq!(mock.count(Method::EnableLightningCancel).await, 1);
    assert!(output(shell).contains("the task was cancelled"));
}
