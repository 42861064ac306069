// crates/toolhub-gateway/src/aggregator.rs
// ============================================================================
// Module: Aggregator
// Description: Full-surface MCP endpoint over every visible backend server.
// Purpose: Multiplex backend tools into one list and route calls to owners.
// Dependencies: toolhub-core, async-trait, serde_json
// ============================================================================

//! ## Overview
//! The aggregator lists every permitted tool of every running, enabled
//! backend server visible in the caller's partition scope. Servers are
//! visited in name order; when two servers advertise the same tool name the
//! first one wins. `tools/call` lists servers in the same order and stops at
//! the first one that owns and permits the tool, then invokes it through the
//! facade's permission and normalization path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use toolhub_core::BackendRegistry;
use toolhub_core::PartitionId;
use toolhub_core::ServerDescriptor;
use toolhub_core::ToolDescriptor;

use crate::entry_service::EntryErrorCode;
use crate::entry_service::EntryService;
use crate::entry_service::ToolCallRequest;
use crate::jsonrpc::CallMetadata;
use crate::jsonrpc::INVALID_PARAMS;
use crate::jsonrpc::JsonRpcRequest;
use crate::jsonrpc::JsonRpcResponse;
use crate::jsonrpc::Lifecycle;
use crate::jsonrpc::McpEndpoint;
use crate::jsonrpc::METHOD_NOT_FOUND;
use crate::jsonrpc::ToolCallParams;
use crate::jsonrpc::ToolCallResult;
use crate::jsonrpc::handle_lifecycle;
use crate::jsonrpc::tool_result_response;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name reported by `initialize`.
pub const AGGREGATOR_SERVER_NAME: &str = "toolhub";

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// One listed tool and whether its server permits it.
struct IndexedTool {
    /// Tool permitted by the server's permission map.
    allowed: bool,
    /// Tool descriptor.
    tool: ToolDescriptor,
}

/// Full-surface JSON-RPC endpoint.
pub struct Aggregator {
    /// Backend registry.
    registry: Arc<dyn BackendRegistry>,
    /// Shared call validation path.
    service: EntryService,
}

impl Aggregator {
    /// Creates an aggregator over the registry.
    #[must_use]
    pub fn new(registry: Arc<dyn BackendRegistry>, service: EntryService) -> Self {
        Self {
            registry,
            service,
        }
    }

    /// Returns visible callable servers in server-name order.
    async fn visible_servers(&self, partition: Option<&PartitionId>) -> Vec<ServerDescriptor> {
        let mut servers: Vec<_> = self
            .registry
            .servers()
            .await
            .into_iter()
            .filter(|server| server.is_callable() && server.visible_in(partition))
            .collect();
        servers.sort_by(|left, right| left.name.cmp(&right.name));
        servers
    }

    /// Collects tools from visible callable servers in server-name order.
    async fn index(&self, partition: Option<&PartitionId>) -> Vec<IndexedTool> {
        let mut index = Vec::new();
        for server in self.visible_servers(partition).await {
            let Ok(tools) = self.registry.list_tools(&server.name).await else {
                continue;
            };
            for tool in tools {
                index.push(IndexedTool {
                    allowed: server.tool_allowed(&tool.name),
                    tool,
                });
            }
        }
        index
    }

    /// Lists permitted tools, first owner winning on name collisions.
    pub async fn list_tools(&self, partition: Option<&PartitionId>) -> Vec<ToolDescriptor> {
        let mut seen = BTreeSet::new();
        self.index(partition)
            .await
            .into_iter()
            .filter(|entry| entry.allowed && seen.insert(entry.tool.name.clone()))
            .map(|entry| entry.tool)
            .collect()
    }

    /// Routes a tool call to its owning server.
    pub async fn call_tool(
        &self,
        params: ToolCallParams,
        partition: Option<&PartitionId>,
    ) -> ToolCallResult {
        let mut disabled_owner = None;
        for server in self.visible_servers(partition).await {
            let Ok(tools) = self.registry.list_tools(&server.name).await else {
                continue;
            };
            if !tools.iter().any(|tool| tool.name == params.name) {
                continue;
            }
            if server.tool_allowed(&params.name) {
                return self.invoke(&server, params).await;
            }
            if disabled_owner.is_none() {
                disabled_owner = Some(server);
            }
        }
        match disabled_owner {
            Some(server) => self.invoke(&server, params).await,
            None => ToolCallResult::error_text(
                format!("Tool \"{}\" not found", params.name),
                Some(EntryErrorCode::ToolNotFound.as_str()),
            ),
        }
    }

    /// Invokes the tool on its resolved owner.
    async fn invoke(&self, server: &ServerDescriptor, params: ToolCallParams) -> ToolCallResult {
        let request = ToolCallRequest {
            server_name: server.name.clone(),
            tool_name: params.name,
            arguments: params.arguments,
            timeout: None,
        };
        self.service.invoke(server, request).await.into_result()
    }
}

#[async_trait]
impl McpEndpoint for Aggregator {
    async fn handle(
        &self,
        request: JsonRpcRequest,
        meta: &CallMetadata,
    ) -> Option<JsonRpcResponse> {
        let request = match handle_lifecycle(request, AGGREGATOR_SERVER_NAME) {
            Lifecycle::Handled(response) => return response,
            Lifecycle::Pass(request) => request,
        };
        let id = request.response_id();
        let partition = meta.partition.as_ref();
        let response = match request.method.as_str() {
            "tools/list" => {
                let tools = self.list_tools(partition).await;
                match serde_json::to_value(&tools) {
                    Ok(tools) => JsonRpcResponse::success(id, json!({"tools": tools})),
                    Err(_) => JsonRpcResponse::success(id, json!({"tools": Value::Array(Vec::new())})),
                }
            }
            "tools/call" => {
                let params = request.params.map(serde_json::from_value::<ToolCallParams>);
                match params {
                    Some(Ok(params)) => {
                        tool_result_response(id, &self.call_tool(params, partition).await)
                    }
                    _ => JsonRpcResponse::failure(id, INVALID_PARAMS, "invalid tools/call params"),
                }
            }
            "resources/list" => JsonRpcResponse::success(id, json!({"resources": []})),
            "resources/templates/list" => {
                JsonRpcResponse::success(id, json!({"resourceTemplates": []}))
            }
            "prompts/list" => JsonRpcResponse::success(id, json!({"prompts": []})),
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
        };
        Some(response)
    }
}
