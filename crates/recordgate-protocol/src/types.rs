//! Tool metadata and invocation result types
//!
//! The enumeration contract (`tools/list`) must carry enough schema for a
//! calling agent to discover the tool's arguments without out-of-band
//! documentation, so [`Tool`] embeds a JSON-Schema-shaped
//! [`ToolInputSchema`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata describing a single invocable tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (the `name` argument of `tools/call`)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Argument schema
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
}

/// JSON-Schema-shaped description of a tool's arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Schema type, always "object" for tool arguments
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Per-property schemas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,
    /// Names of required properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ToolInputSchema {
    /// Schema for an object with the given properties, all required
    pub fn object(properties: HashMap<String, Value>, required: Vec<String>) -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Some(properties),
            required: Some(required),
        }
    }
}

/// Parameters of a `tools/call` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to invoke
    pub name: String,
    /// Loosely-typed argument bag, validated per-tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Result of a tool invocation
///
/// A tool-level failure sets `is_error` but still travels inside a
/// *successful* JSON-RPC response: the protocol call succeeded, the tool
/// merely reports failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Result content blocks
    pub content: Vec<Content>,
    /// Set when the tool itself failed
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// Successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text(TextContent { text: text.into() })],
            is_error: None,
        }
    }

    /// Tool-level error result (embedded, not a protocol failure)
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text(TextContent { text: text.into() })],
            is_error: Some(true),
        }
    }
}

/// A single content block in a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text content
    Text(TextContent),
}

/// Text content block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// The text payload
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_serializes_camel_case_schema() {
        let mut props = HashMap::new();
        props.insert(
            "count".to_string(),
            json!({"type": "integer", "description": "How many records"}),
        );
        let tool = Tool {
            name: "get_last_n_records".to_string(),
            description: "tail a record source".to_string(),
            input_schema: ToolInputSchema::object(props, vec!["count".to_string()]),
        };

        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["inputSchema"]["type"], json!("object"));
        assert_eq!(value["inputSchema"]["required"], json!(["count"]));
    }

    #[test]
    fn error_result_sets_is_error() {
        let result = CallToolResult::error("boom");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isError"], json!(true));
        assert_eq!(value["content"][0]["type"], json!("text"));
        assert_eq!(value["content"][0]["text"], json!("boom"));
    }

    #[test]
    fn success_result_omits_is_error() {
        let result = CallToolResult::text("ok");
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("isError").is_none());
    }

    #[test]
    fn call_params_parse_with_arguments() {
        let params: CallToolParams = serde_json::from_value(
            json!({"name": "get_last_n_records", "arguments": {"count": 3}}),
        )
        .unwrap();
        assert_eq!(params.name, "get_last_n_records");
        assert_eq!(params.arguments.unwrap()["count"], json!(3));
    }
}
