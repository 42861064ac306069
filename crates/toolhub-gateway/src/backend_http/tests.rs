// crates/toolhub-gateway/src/backend_http/tests.rs
// ============================================================================
// Module: HTTP Backend Unit Tests
// Description: Unit tests for SSE framing and backend spec construction.
// Purpose: Validate incremental event decoding and call deadline behavior.
// Dependencies: toolhub-gateway
// ============================================================================

//! ## Overview
//! Exercises the SSE decoder with split, CRLF, and multi-line input.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

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
    reason = "Test-only decoder assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use super::Deadline;
use super::HttpBackendSpec;
use super::SseDecoder;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn decodes_single_event() {
    let mut decoder = SseDecoder::default();
    let events = decoder.push(b"event: message\ndata: {\"id\":1}\n\n");
    assert_eq!(events, vec!["{\"id\":1}".to_string()]);
}

#[test]
fn holds_partial_event_until_terminated() {
    let mut decoder = SseDecoder::default();
    assert!(decoder.push(b"data: {\"id\"").is_empty());
    assert!(decoder.push(b":2}\n").is_empty());
    assert_eq!(decoder.push(b"\n"), vec!["{\"id\":2}".to_string()]);
}

#[test]
fn strips_carriage_returns() {
    let mut decoder = SseDecoder::default();
    let events = decoder.push(b"data: first\r\n\r\ndata: second\r\n\r\n");
    assert_eq!(events, vec!["first".to_string(), "second".to_string()]);
}

#[test]
fn joins_multi_line_data() {
    let mut decoder = SseDecoder::default();
    let events = decoder.push(b"data: line one\ndata:line two\n\n");
    assert_eq!(events, vec!["line one\nline two".to_string()]);
}

#[test]
fn skips_events_without_data() {
    let mut decoder = SseDecoder::default();
    let events = decoder.push(b": keep-alive\n\nevent: ping\n\ndata: x\n\n");
    assert_eq!(events, vec!["x".to_string()]);
}

#[test]
fn new_spec_is_enabled_and_unassigned() {
    let spec = HttpBackendSpec::new("alpha", "http://127.0.0.1:9/mcp");
    assert!(!spec.disabled);
    assert!(spec.partition.is_none());
    assert!(spec.bearer_token.is_none());
    assert!(spec.tool_permissions.is_empty());
}

#[tokio::test]
async fn expired_deadline_reports_configured_window() {
    let mut deadline = Deadline::after(Duration::from_millis(250));
    deadline.restart();
    assert_eq!(deadline.expired().to_string(), "request timed out after 250 ms");
}

#[tokio::test]
async fn oversized_window_saturates_instead_of_overflowing() {
    let mut deadline = Deadline::after(Duration::MAX);
    assert!(deadline.at > tokio::time::Instant::now() + Duration::from_secs(3600));
    deadline.restart();
    assert!(deadline.at > tokio::time::Instant::now() + Duration::from_secs(3600));
    assert_eq!(
        deadline.expired().to_string(),
        format!("request timed out after {} ms", Duration::MAX.as_millis())
    );
}
