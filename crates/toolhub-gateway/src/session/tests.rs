// crates/toolhub-gateway/src/session/tests.rs
// ============================================================================
// Module: Session Table Unit Tests
// Description: Unit tests for session registration, lookup, and removal.
// Purpose: Validate drop-guarded lifetimes and id uniqueness.
// Dependencies: toolhub-gateway
// ============================================================================

//! ## Overview
//! Exercises the session table with in-memory channels.

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
    reason = "Test-only session assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tokio_stream::StreamExt;
use toolhub_core::PartitionId;

use super::SessionFrame;
use super::SessionIdGenerator;
use super::SessionMessage;
use super::SessionTable;
use crate::jsonrpc::CallMetadata;
use crate::telemetry::RouteKind;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn open_emits_endpoint_frame_first() {
    let table = Arc::new(SessionTable::new());
    let (id, mut stream, _inbox) = table.open(None);
    let frame = stream.next().await.unwrap();
    assert_eq!(frame.event, "endpoint");
    assert_eq!(frame.data, format!("/messages?sessionId={id}"));
}

#[tokio::test]
async fn lookup_returns_captured_partition_and_channel() {
    let table = Arc::new(SessionTable::new());
    let (id, mut stream, _inbox) = table.open(Some(PartitionId::new("p-1")));
    let _ = stream.next().await;

    let handle = table.lookup(id.as_str()).unwrap();
    assert_eq!(handle.partition, Some(PartitionId::new("p-1")));
    handle.sender.send(SessionFrame::message("{}".to_string())).await.unwrap();
    let frame = stream.next().await.unwrap();
    assert_eq!(frame, SessionFrame::message("{}".to_string()));
}

#[tokio::test]
async fn inbox_yields_messages_in_arrival_order() {
    let table = Arc::new(SessionTable::new());
    let (id, mut stream, mut inbox) = table.open(None);
    let _ = stream.next().await;
    let handle = table.lookup(id.as_str()).unwrap();
    for n in 1 ..= 3 {
        let request = serde_json::from_value(json!({"jsonrpc": "2.0", "id": n, "method": "ping"}))
            .unwrap();
        let meta = CallMetadata {
            token: "secret-token".to_string(),
            partition: None,
            route: RouteKind::StreamMessage,
        };
        handle
            .inbox
            .send(SessionMessage {
                request,
                meta,
            })
            .await
            .unwrap();
    }
    for n in 1 ..= 3 {
        let message = inbox.recv().await.unwrap();
        assert_eq!(message.request.id, Some(json!(n)));
    }
    assert_eq!(inbox.id(), &id);
    assert!(inbox.reply(SessionFrame::message("done".to_string())).await);
    assert_eq!(stream.next().await.unwrap(), SessionFrame::message("done".to_string()));
}

#[tokio::test]
async fn inbox_ends_after_session_closes() {
    let table = Arc::new(SessionTable::new());
    let (id, stream, mut inbox) = table.open(None);
    assert!(table.close(&id));
    assert!(inbox.recv().await.is_none());
    drop(stream);
}

#[test]
fn dropping_stream_removes_session() {
    let table = Arc::new(SessionTable::new());
    let (id, stream, _inbox) = table.open(None);
    assert!(table.contains(&id));
    assert_eq!(table.len(), 1);
    drop(stream);
    assert!(!table.contains(&id));
    assert!(table.lookup(id.as_str()).is_none());
    assert!(table.is_empty());
}

#[test]
fn close_is_idempotent() {
    let table = Arc::new(SessionTable::new());
    let (id, stream, _inbox) = table.open(None);
    assert!(table.close(&id));
    assert!(!table.close(&id));
    drop(stream);
    assert!(table.is_empty());
}

#[test]
fn unknown_session_lookup_is_none() {
    let table = SessionTable::new();
    assert!(table.lookup("does-not-exist").is_none());
}

#[test]
fn generator_ids_are_unique_across_threads() {
    let generator = Arc::new(SessionIdGenerator::new());
    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let generator = Arc::clone(&generator);
            std::thread::spawn(move || (0 .. 500).map(|_| generator.issue()).collect::<Vec<_>>())
        })
        .collect();
    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "duplicate session id");
        }
    }
    assert_eq!(seen.len(), 4000);
}

#[tokio::test]
async fn concurrent_opens_register_distinct_sessions() {
    let table = Arc::new(SessionTable::new());
    let tasks: Vec<_> = (0 .. 32)
        .map(|_| {
            let table = Arc::clone(&table);
            tokio::spawn(async move { table.open(None) })
        })
        .collect();
    let mut streams = Vec::new();
    let mut ids = HashSet::new();
    for task in tasks {
        let (id, stream, _inbox) = task.await.unwrap();
        assert!(ids.insert(id));
        streams.push(stream);
    }
    assert_eq!(table.len(), 32);
    drop(streams);
    assert!(table.is_empty());
}
