//! Tool invocation dispatcher
//!
//! Maps JSON-RPC methods onto the single exposed tool. Protocol-level
//! failures (unknown method, unknown tool, malformed params) become JSON-RPC
//! error responses; tool-level failures (bad argument, unreadable source)
//! ride inside a successful envelope with `isError` set, so a calling agent
//! can read them as tool output.

use std::collections::HashMap;
use std::sync::Arc;

use recordgate_protocol::{
    CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ResponseId,
    Tool, ToolInputSchema,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::records::RecordStore;

/// The single exposed tool
pub const TOOL_GET_LAST_N_RECORDS: &str = "get_last_n_records";

/// Stateless request dispatcher over a record store
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    store: Arc<dyn RecordStore>,
}

impl ToolDispatcher {
    /// Create a dispatcher over the given record store
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Handle one request, always producing a response
    pub fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "dispatching request");
        match request.method.as_str() {
            "tools/list" => JsonRpcResponse::success(request.id, json!({ "tools": [tool()] })),
            "tools/call" => self.call_tool(request),
            other => {
                warn!(method = %other, "unknown method");
                JsonRpcResponse::error(
                    ResponseId::from_request(request.id),
                    JsonRpcError::method_not_found(other),
                )
            }
        }
    }

    fn call_tool(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;
        let params: CallToolParams = match request.params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    ResponseId::from_request(id),
                    JsonRpcError::invalid_params(format!("invalid tool call params: {e}")),
                )
            }
            None => {
                return JsonRpcResponse::error(
                    ResponseId::from_request(id),
                    JsonRpcError::invalid_params("missing tool call params"),
                )
            }
        };

        if params.name != TOOL_GET_LAST_N_RECORDS {
            warn!(tool = %params.name, "unknown tool");
            return JsonRpcResponse::error(
                ResponseId::from_request(id),
                JsonRpcError::invalid_params(format!("unknown tool: {}", params.name)),
            );
        }

        let result = self.get_last_n_records(params.arguments.as_ref());
        JsonRpcResponse::success(id, json!(result))
    }

    /// The tool itself: validate the argument, read the tail, format rows
    fn get_last_n_records(&self, arguments: Option<&Value>) -> CallToolResult {
        let count = arguments
            .and_then(|args| args.get("count"))
            .and_then(Value::as_i64)
            .filter(|n| *n > 0);

        let Some(count) = count else {
            return CallToolResult::error("count must be a positive integer");
        };

        let rows = match self.store.last_n(count as usize) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "record store failure");
                return CallToolResult::error(e.to_string());
            }
        };

        if rows.is_empty() {
            return CallToolResult::text("No records found.");
        }

        let body = rows
            .iter()
            .map(|row| row.join(","))
            .collect::<Vec<_>>()
            .join("\n");
        CallToolResult::text(body)
    }
}

/// Metadata for the one tool this connector exposes
fn tool() -> Tool {
    let mut properties = HashMap::new();
    properties.insert(
        "count".to_string(),
        json!({
            "type": "integer",
            "description": "How many records to return from the end of the file",
        }),
    );
    Tool {
        name: TOOL_GET_LAST_N_RECORDS.to_string(),
        description: "Return the last N records from the configured CSV file".to_string(),
        input_schema: ToolInputSchema::object(properties, vec!["count".to_string()]),
    }
}
