// crates/toolhub-core/tests/descriptors.rs
// ============================================================================
// Module: Descriptor Tests
// Description: Tests for server callability, tool permissions, and visibility.
// ============================================================================
//! ## Overview
//! Validates partition scoping and the serialized descriptor shape.

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

use proptest::prelude::*;
use serde_json::json;
use toolhub_core::PartitionId;
use toolhub_core::RuntimeStatus;
use toolhub_core::ServerDescriptor;
use toolhub_core::ToolDescriptor;
use toolhub_core::UNASSIGNED_PARTITION;
use toolhub_core::token_fingerprint;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn only_running_enabled_servers_are_callable() {
    let mut server = ServerDescriptor::running("fs");
    assert!(server.is_callable());
    server.disabled = true;
    assert!(!server.is_callable());
    server.disabled = false;
    server.runtime_status = RuntimeStatus::Stopped;
    assert!(!server.is_callable());
}

#[test]
fn tools_are_allowed_unless_explicitly_false() {
    let mut server = ServerDescriptor::running("fs");
    server.tool_permissions.insert("write_file".to_string(), false);
    server.tool_permissions.insert("read_file".to_string(), true);
    assert!(server.tool_allowed("read_file"));
    assert!(server.tool_allowed("list_dir"));
    assert!(!server.tool_allowed("write_file"));
}

#[test]
fn unassigned_scope_selects_servers_without_partition() {
    let loose = ServerDescriptor::running("loose");
    let mut owned = ServerDescriptor::running("owned");
    owned.partition = Some(PartitionId::new("p-1"));

    let unassigned = PartitionId::new(UNASSIGNED_PARTITION);
    assert!(unassigned.is_unassigned());
    assert!(loose.visible_in(Some(&unassigned)));
    assert!(!owned.visible_in(Some(&unassigned)));

    assert!(owned.visible_in(Some(&PartitionId::new("p-1"))));
    assert!(!loose.visible_in(Some(&PartitionId::new("p-1"))));
    assert!(!owned.visible_in(Some(&PartitionId::new("p-2"))));
}

#[test]
fn server_descriptor_serializes_camel_case() {
    let mut server = ServerDescriptor::running("fs");
    server.partition = Some(PartitionId::new("p-1"));
    let value = serde_json::to_value(&server).unwrap();
    assert_eq!(
        value,
        json!({
            "name": "fs",
            "runtimeStatus": "running",
            "disabled": false,
            "toolPermissions": {},
            "partition": "p-1"
        })
    );
}

#[test]
fn tool_descriptor_relays_unmodelled_fields() {
    let advertised = json!({
        "name": "read_file",
        "title": "Read File",
        "description": "Reads a file",
        "inputSchema": {"type": "object"},
        "outputSchema": {"type": "object", "properties": {"text": {"type": "string"}}},
        "annotations": {"readOnlyHint": true},
        "_meta": {"vendor/tag": 7}
    });
    let tool: ToolDescriptor = serde_json::from_value(advertised.clone()).unwrap();
    assert_eq!(tool.name, "read_file");
    assert_eq!(tool.extra.get("title"), Some(&json!("Read File")));
    assert_eq!(serde_json::to_value(&tool).unwrap(), advertised);
}

#[test]
fn named_tool_serializes_only_its_name() {
    let tool = ToolDescriptor::named("ping");
    assert_eq!(serde_json::to_value(&tool).unwrap(), json!({"name": "ping"}));
}

#[test]
fn token_fingerprint_is_sha256_hex() {
    assert_eq!(
        token_fingerprint("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

proptest! {
    #[test]
    fn unscoped_listing_sees_every_server(partition in proptest::option::of("[a-z]{1,8}")) {
        let mut server = ServerDescriptor::running("any");
        server.partition = partition.map(PartitionId::new);
        prop_assert!(server.visible_in(None));
    }

    #[test]
    fn scoped_listing_matches_exact_partition(owner in "[a-z]{1,8}", scope in "[a-z]{1,8}") {
        let mut server = ServerDescriptor::running("any");
        server.partition = Some(PartitionId::new(owner.clone()));
        prop_assert_eq!(server.visible_in(Some(&PartitionId::new(scope.clone()))), owner == scope);
    }
}
