//! # recordgate-protocol
//!
//! Wire types for the recordgate tool-invocation protocol: a minimal
//! JSON-RPC 2.0 envelope plus the tool metadata and result types a calling
//! agent needs to discover and invoke the server's tools.
//!
//! The envelope keeps the JSON-RPC contract strict:
//!
//! - the `jsonrpc` field must be exactly `"2.0"` (enforced at deserialization)
//! - a response carries either `result` or `error`, never both
//! - tool-level failures are *not* protocol failures: they travel inside a
//!   successful response as a [`CallToolResult`] with `is_error` set
//!
//! # Modules
//!
//! - [`jsonrpc`] - request/response envelope and standard error codes
//! - [`types`] - tool metadata, input schemas, and call results

pub mod jsonrpc;
pub mod types;

pub use jsonrpc::error_codes;
pub use jsonrpc::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, JsonRpcVersion, RequestId, ResponseId,
};
pub use types::{CallToolParams, CallToolResult, Content, TextContent, Tool, ToolInputSchema};
