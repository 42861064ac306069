// crates/toolhub-core/tests/content.rs
// ============================================================================
// Module: Content Normalization Tests
// Description: Tests for backend payload normalization into content items.
// ============================================================================
//! ## Overview
//! Validates string promotion, MCP content array mapping, and error flags.

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

use serde_json::json;
use toolhub_core::ContentItem;
use toolhub_core::normalize_tool_output;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn bare_string_becomes_text_item() {
    let output = normalize_tool_output(json!("hello"));
    assert_eq!(output.content, vec![ContentItem::text("hello")]);
    assert!(!output.is_error);
}

#[test]
fn mcp_content_array_maps_each_kind() {
    let output = normalize_tool_output(json!({
        "content": [
            {"type": "text", "text": "line"},
            {"type": "image", "data": "aGk=", "mimeType": "image/png"},
            {"type": "audio", "data": "aGk=", "mimeType": "audio/wav"},
            {"type": "resource", "resource": {"uri": "file:///x", "text": "x"}}
        ]
    }));
    assert_eq!(output.content.len(), 4);
    assert_eq!(output.content[0].as_text(), Some("line"));
    assert_eq!(
        output.content[1],
        ContentItem::Image {
            data: "aGk=".to_string(),
            mime_type: "image/png".to_string(),
        }
    );
    assert!(matches!(output.content[2], ContentItem::Audio { .. }));
    assert_eq!(
        output.content[3],
        ContentItem::Resource {
            resource: json!({"uri": "file:///x", "text": "x"}),
        }
    );
}

#[test]
fn backend_error_flag_is_preserved() {
    let output = normalize_tool_output(json!({
        "content": [{"type": "text", "text": "boom"}],
        "isError": true
    }));
    assert!(output.is_error);
    assert_eq!(output.content[0].as_text(), Some("boom"));
}

#[test]
fn resource_link_is_relayed_as_a_link() {
    let link = json!({
        "type": "resource_link",
        "uri": "file:///a",
        "name": "a",
        "mimeType": "text/plain"
    });
    let output = normalize_tool_output(json!({"content": [link.clone()]}));
    assert_eq!(output.content.len(), 1);
    let ContentItem::ResourceLink {
        uri,
        fields,
    } = &output.content[0]
    else {
        panic!("expected resource link, got {:?}", output.content[0]);
    };
    assert_eq!(uri, "file:///a");
    assert_eq!(fields.get("name"), Some(&json!("a")));
    assert_eq!(serde_json::to_value(&output.content[0]).unwrap(), link);
}

#[test]
fn resource_link_without_uri_renders_as_json_text() {
    let output = normalize_tool_output(json!({
        "content": [{"type": "resource_link", "name": "a"}]
    }));
    let text = output.content[0].as_text().unwrap();
    let rendered: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(rendered, json!({"type": "resource_link", "name": "a"}));
}

#[test]
fn unknown_shapes_render_as_json_text() {
    let output = normalize_tool_output(json!({"rows": 3}));
    assert_eq!(output.content, vec![ContentItem::text(r#"{"rows":3}"#)]);

    let output = normalize_tool_output(json!(42));
    assert_eq!(output.content, vec![ContentItem::text("42")]);

    let output = normalize_tool_output(json!({"content": [{"type": "video", "url": "u"}]}));
    assert_eq!(output.content.len(), 1);
    assert!(output.content[0].as_text().unwrap().contains("video"));
}

#[test]
fn plain_array_maps_items() {
    let output = normalize_tool_output(json!(["a", {"type": "text", "text": "b"}]));
    assert_eq!(output.content, vec![ContentItem::text("a"), ContentItem::text("b")]);
}

#[test]
fn content_items_serialize_with_type_tag() {
    let value = serde_json::to_value(ContentItem::Image {
        data: "d".to_string(),
        mime_type: "image/png".to_string(),
    })
    .unwrap();
    assert_eq!(value, json!({"type": "image", "data": "d", "mimeType": "image/png"}));
}
