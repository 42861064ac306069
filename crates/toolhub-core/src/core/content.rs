// crates/toolhub-core/src/core/content.rs
// ============================================================================
// Module: Toolhub Content Items
// Description: Tagged union of tool-call result content and normalization.
// Purpose: Turn arbitrary backend payloads into a uniform content list.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Backends answer tool calls with loosely shaped JSON. The gateway relays a
//! uniform list of [`ContentItem`] values: bare strings are promoted to text,
//! MCP `content` arrays are mapped item by item, and anything unrecognized is
//! rendered as JSON text so nothing is silently dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Content Items
// ============================================================================

/// A single item of tool-call output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain text.
    Text {
        /// Text body.
        text: String,
    },
    /// Inline base64 image data.
    Image {
        /// Base64 payload.
        data: String,
        /// Media type of the payload.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Inline base64 audio data.
    Audio {
        /// Base64 payload.
        data: String,
        /// Media type of the payload.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Resource reference, passed through unmodified.
    Resource {
        /// Opaque resource object.
        resource: Value,
    },
    /// Link to a resource the client may fetch, relayed as advertised.
    ResourceLink {
        /// Resource URI.
        uri: String,
        /// Remaining link fields (`name`, `mimeType`, `description`, ...).
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
}

impl ContentItem {
    /// Builds a text item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
        }
    }

    /// Returns the text body for text items.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text {
                text,
            } => Some(text),
            _ => None,
        }
    }
}

/// Normalized tool output.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOutput {
    /// Content items in backend order.
    pub content: Vec<ContentItem>,
    /// Error flag reported by the backend.
    pub is_error: bool,
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes a backend tool-call payload into content items.
///
/// - A string becomes one text item.
/// - An object with a `content` array is mapped item by item and its
///   `isError` flag is preserved.
/// - An array is mapped item by item.
/// - Anything else is rendered as JSON text.
#[must_use]
pub fn normalize_tool_output(payload: Value) -> NormalizedOutput {
    match payload {
        Value::String(text) => NormalizedOutput {
            content: vec![ContentItem::text(text)],
            is_error: false,
        },
        Value::Object(mut object) => {
            let is_error = object.get("isError").and_then(Value::as_bool).unwrap_or(false);
            match object.remove("content") {
                Some(Value::Array(items)) => NormalizedOutput {
                    content: items.into_iter().map(normalize_item).collect(),
                    is_error,
                },
                Some(other) => {
                    object.insert("content".to_string(), other);
                    NormalizedOutput {
                        content: vec![json_text(&Value::Object(object))],
                        is_error,
                    }
                }
                None => NormalizedOutput {
                    content: vec![json_text(&Value::Object(object))],
                    is_error,
                },
            }
        }
        Value::Array(items) => NormalizedOutput {
            content: items.into_iter().map(normalize_item).collect(),
            is_error: false,
        },
        other => NormalizedOutput {
            content: vec![json_text(&other)],
            is_error: false,
        },
    }
}

/// Maps one backend content entry to a content item.
fn normalize_item(item: Value) -> ContentItem {
    match item {
        Value::String(text) => ContentItem::text(text),
        Value::Object(object) => normalize_object_item(object),
        other => json_text(&other),
    }
}

/// Maps one backend content object by its `type` tag.
fn normalize_object_item(object: Map<String, Value>) -> ContentItem {
    let kind = object.get("type").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "text" => match object.get("text").and_then(Value::as_str) {
            Some(text) => ContentItem::text(text),
            None => json_text(&Value::Object(object)),
        },
        "image" | "audio" => {
            let data = object.get("data").and_then(Value::as_str);
            let mime = object.get("mimeType").and_then(Value::as_str);
            match (data, mime) {
                (Some(data), Some(mime)) if kind == "image" => ContentItem::Image {
                    data: data.to_string(),
                    mime_type: mime.to_string(),
                },
                (Some(data), Some(mime)) => ContentItem::Audio {
                    data: data.to_string(),
                    mime_type: mime.to_string(),
                },
                _ => json_text(&Value::Object(object)),
            }
        }
        "resource" => match object.get("resource") {
            Some(resource) => ContentItem::Resource {
                resource: resource.clone(),
            },
            None => json_text(&Value::Object(object)),
        },
        "resource_link" => match object.get("uri").and_then(Value::as_str) {
            Some(uri) => {
                let uri = uri.to_string();
                let mut fields = object;
                fields.remove("type");
                fields.remove("uri");
                ContentItem::ResourceLink {
                    uri,
                    fields,
                }
            }
            None => json_text(&Value::Object(object)),
        },
        _ => json_text(&Value::Object(object)),
    }
}

/// Renders a JSON value as a text item.
fn json_text(value: &Value) -> ContentItem {
    ContentItem::text(value.to_string())
}
