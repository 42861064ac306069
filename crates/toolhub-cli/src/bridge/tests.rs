// crates/toolhub-cli/src/bridge/tests.rs
// ============================================================================
// Module: Stdio Bridge Tests
// Description: Unit tests for line forwarding against a mock facade.
// Purpose: Validate headers, reply framing, and unreachable-gateway replies.
// Dependencies: toolhub-cli bridge, httpmock
// ============================================================================

//! ## Overview
//! Drives [`Bridge::run`] with in-memory input and output buffers.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::Value;
use serde_json::json;

use super::Bridge;
use super::BridgeConfig;
use super::BridgeError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a bridge pointed at `endpoint`.
fn bridge(endpoint: String) -> Bridge {
    Bridge::new(BridgeConfig {
        endpoint,
        project: "alpha".to_string(),
        token: "secret-token".to_string(),
    })
    .unwrap()
}

/// Runs the bridge over `input` and returns the written lines.
async fn run(bridge: &Bridge, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    bridge.run(input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn forwards_lines_with_token_and_project() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/entry/mcp")
                .header("authorization", "Bearer secret-token")
                .header("x-toolhub-project", "alpha")
                .body_includes("\"tools/list\"");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}));
        })
        .await;
    let bridge = bridge(server.url("/entry/mcp"));
    let replies = run(&bridge, "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n").await;
    assert_eq!(replies, vec![json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}})]);
    mock.assert_async().await;
}

#[tokio::test]
async fn accepted_notifications_and_blank_lines_write_nothing() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/entry/mcp");
            then.status(202);
        })
        .await;
    let bridge = bridge(server.url("/entry/mcp"));
    let input = "\n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n   \n";
    assert!(run(&bridge, input).await.is_empty());
    mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn error_statuses_relay_the_envelope() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/entry/mcp");
            then.status(401).header("content-type", "application/json").json_body(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32001, "message": "invalid bearer token"}
            }));
        })
        .await;
    let bridge = bridge(server.url("/entry/mcp"));
    let replies = run(&bridge, "{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"ping\"}").await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["error"]["code"], -32001);
}

#[tokio::test]
async fn slow_replies_are_awaited_without_a_total_deadline() {
    let server = MockServer::start_async().await;
    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/entry/mcp");
            then.status(200)
                .delay(Duration::from_secs(2))
                .header("content-type", "application/json")
                .json_body(json!({"jsonrpc": "2.0", "id": 9, "result": {"content": []}}));
        })
        .await;
    let bridge = bridge(server.url("/entry/mcp"));
    let replies = run(&bridge, "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"tools/call\"}\n").await;
    assert_eq!(replies, vec![json!({"jsonrpc": "2.0", "id": 9, "result": {"content": []}})]);
}

#[tokio::test]
async fn unreachable_gateway_answers_requests_only() {
    let bridge = bridge("http://127.0.0.1:9/entry/mcp".to_string());
    let input = concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":\"req-1\",\"method\":\"tools/list\"}\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        "not json\n"
    );
    let replies = run(&bridge, input).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], "req-1");
    assert_eq!(replies[0]["error"]["code"], -32603);
}

#[tokio::test]
async fn unreachable_gateway_answers_null_id_requests() {
    let bridge = bridge("http://127.0.0.1:9/entry/mcp".to_string());
    let replies = run(&bridge, "{\"jsonrpc\":\"2.0\",\"id\":null,\"method\":\"ping\"}\n").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0]["id"].is_null());
    assert_eq!(replies[0]["error"]["code"], -32603);
}

#[test]
fn empty_token_is_rejected() {
    let result = Bridge::new(BridgeConfig {
        endpoint: "http://127.0.0.1:8765/entry/mcp".to_string(),
        project: "alpha".to_string(),
        token: "  ".to_string(),
    });
    assert!(matches!(result, Err(BridgeError::Config(_))));
}

#[test]
fn project_must_be_a_valid_header() {
    let result = Bridge::new(BridgeConfig {
        endpoint: "http://127.0.0.1:8765/entry/mcp".to_string(),
        project: "bad\nproject".to_string(),
        token: "secret-token".to_string(),
    });
    assert!(matches!(result, Err(BridgeError::Config(_))));
}
