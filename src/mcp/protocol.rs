//! JSON-RPC 2.0 framing for the per-agent endpoints.
//!
//! Payloads are `rmcp::model` types; only the envelope lives here, since a
//! parse error must still be answered with a `null` id.

use rmcp::model::{ErrorCode, ErrorData, ProtocolVersion, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version reported by `initialize`.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V_2024_11_05;

/// Incoming request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    /// Must be `"2.0"`.
    pub jsonrpc: String,
    /// Echoed back; absent for notifications.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Method name, e.g. `tools/call`.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl McpRequest {
    /// Builds a request with id 1.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Some(RequestId::Number(1)),
            method: method.into(),
            params,
        }
    }
}

/// Outgoing response: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request id.
    pub id: Option<RequestId>,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl McpResponse {
    /// Success response.
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn error(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(ErrorData::new(code, message.into(), None)),
        }
    }

    /// Whether this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Error code, if this is an error response.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_value(McpResponse::success(Some(RequestId::Number(7)), json!({"a": 1}))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 7, "result": {"a": 1}}));

        let err = serde_json::to_value(McpResponse::error(None, ErrorCode::METHOD_NOT_FOUND, "nope")).unwrap();
        assert_eq!(err["error"]["code"], -32601);
        assert_eq!(err["error"]["message"], "nope");
        assert!(err.get("result").is_none());
    }

    #[test]
    fn test_request_defaults() {
        let req: McpRequest = serde_json::from_value(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert!(req.id.is_none());
        assert!(req.params.is_null());
    }

    #[test]
    fn test_string_ids_round_trip() {
        let req: McpRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": "abc", "method": "ping"})).unwrap();
        let response = serde_json::to_value(McpResponse::success(req.id, json!({}))).unwrap();
        assert_eq!(response["id"], "abc");
    }
}
