//! MCP protocol types
//!
//! JSON-RPC 2.0 envelopes as this server reads and writes them. Request ids
//! are normalised to strings: numbers become their decimal form and a
//! missing id becomes [`NOTIFICATION_ID`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Id used in responses to requests that did not carry one.
pub const NOTIFICATION_ID: &str = "notification";

/// A validated JSON-RPC request.
#[derive(Debug, Clone, PartialEq)]
pub struct McpRequest {
    pub id: String,
    pub method: String,
    pub params: Option<Value>,
}

impl McpRequest {
    pub fn new(id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Checks the envelope of a parsed message. On failure the returned
    /// response is the "Invalid Request" error to send back.
    pub fn from_value(message: &Value) -> Result<Self, McpResponse> {
        let Some(envelope) = message.as_object() else {
            return Err(invalid_request(NOTIFICATION_ID, "request must be an object"));
        };

        let id = match envelope.get("id") {
            None | Some(Value::Null) => NOTIFICATION_ID.to_string(),
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(_) => {
                return Err(invalid_request(NOTIFICATION_ID, "id must be a string or a number"));
            }
        };

        if envelope.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(invalid_request(&id, "jsonrpc must be \"2.0\""));
        }

        let Some(method) = envelope.get("method").and_then(Value::as_str) else {
            return Err(invalid_request(&id, "method must be a string"));
        };

        Ok(Self {
            id,
            method: method.to_string(),
            params: envelope.get("params").filter(|params| !params.is_null()).cloned(),
        })
    }
}

fn invalid_request(id: &str, reason: &str) -> McpResponse {
    McpResponse::error(id.to_string(), McpError::invalid_request(reason))
}

/// MCP JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Request ID (same as request)
    pub id: String,

    /// Result (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl McpResponse {
    pub fn success(id: String, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: String, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// MCP error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_request(reason: &str) -> Self {
        Self::new(Self::INVALID_REQUEST, format!("Invalid Request: {reason}"))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }
}

/// What the transport should send back for one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A JSON-RPC response envelope (HTTP 200).
    Response(McpResponse),
    /// Nothing at all (HTTP 204).
    NoContent,
    /// The body was not JSON (HTTP 400).
    InvalidJson,
}

/// Tool definition for MCP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Input schema (JSON Schema)
    pub input_schema: Value,
}

/// Tool call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// Content block in tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

/// Resource definition for MCP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}
