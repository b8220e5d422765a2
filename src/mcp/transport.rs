//! JSON-RPC 2.0 framing for the MCP connection.
//!
//! Operation failures travel as JSON-RPC errors whose `data` carries the
//! failure tag, so a client can branch on `data.kind` without parsing the
//! message text.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::codec::WireValue;
use crate::errors::{CocoaError, FailureKind};
use crate::registry::OperationDescriptor;

/// One incoming message. Notifications have no `id`, which reads as null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: WireValue,
    pub method: String,
    #[serde(default)]
    pub params: Option<WireValue>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_null() && self.method.starts_with("notifications/")
    }
}

/// One outgoing message: exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: WireValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<WireValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn new(id: WireValue, result: Option<WireValue>, error: Option<JsonRpcError>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
            error,
        }
    }

    pub fn success(id: WireValue, result: WireValue) -> Self {
        Self::new(id, Some(result), None)
    }

    /// A protocol-level error with no failure tag.
    pub fn error(id: WireValue, code: ErrorCode, message: String) -> Self {
        let error = JsonRpcError {
            code: code.as_i32(),
            message,
            data: None,
        };
        Self::new(id, None, Some(error))
    }

    /// An operation failure, tagged with its kind.
    pub fn failure(id: WireValue, err: &CocoaError) -> Self {
        let kind = err.kind();
        let error = JsonRpcError {
            code: ErrorCode::for_failure(kind).as_i32(),
            message: err.to_string(),
            data: Some(json!({ "kind": kind.as_str() })),
        };
        Self::new(id, None, Some(error))
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WireValue>,
}

/// JSON-RPC error codes used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Implementation-defined: the call was well formed but the operation failed.
    ServerError,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError => -32000,
        }
    }

    /// Code reported for an operation failure of the given kind.
    pub fn for_failure(kind: FailureKind) -> Self {
        match kind {
            FailureKind::UnknownOperation | FailureKind::InvalidArguments => Self::InvalidParams,
            FailureKind::Internal => Self::InternalError,
            _ => Self::ServerError,
        }
    }
}

/// A tool as listed by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: WireValue,
}

impl From<&OperationDescriptor> for ToolDefinition {
    fn from(descriptor: &OperationDescriptor) -> Self {
        Self {
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            input_schema: descriptor.input_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: WireValue) -> JsonRpcRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_ids_of_any_kind() {
        let numeric = parse(json!({"jsonrpc": "2.0", "id": 4, "method": "tools/list"}));
        assert_eq!(numeric.id, json!(4));
        assert!(numeric.params.is_none());

        let text = parse(json!({"jsonrpc": "2.0", "id": "req-9", "method": "ping", "params": {}}));
        assert_eq!(text.id, json!("req-9"));
        assert_eq!(text.params, Some(json!({})));
    }

    #[test]
    fn test_notification_has_null_id() {
        let note = parse(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}));
        assert!(note.id.is_null());
        assert!(note.is_notification());
        let call = parse(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}));
        assert!(!call.is_notification());
    }

    #[test]
    fn test_success_omits_error_member() {
        let response = JsonRpcResponse::success(json!(1), json!({"tools": []}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}));
    }

    #[test]
    fn test_protocol_error_has_no_kind() {
        let response = JsonRpcResponse::error(
            json!(2),
            ErrorCode::MethodNotFound,
            "method not found: resources/list".to_string(),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], -32601);
        assert!(value["error"].get("data").is_none());
    }

    #[test]
    fn test_failure_carries_kind() {
        let err = CocoaError::analysis("class 'X' not found");
        let response = JsonRpcResponse::failure(json!(7), &err);
        assert!(response.is_error());
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::ServerError.as_i32());
        assert_eq!(error.data.unwrap()["kind"], "AnalysisError");
        assert!(error.message.contains("class 'X' not found"));
    }

    #[test]
    fn test_failure_codes_by_kind() {
        let cases = [
            (CocoaError::invalid_arguments("get_class_tool", "missing"), -32602),
            (CocoaError::UnknownOperation { name: "x_tool".into() }, -32602),
            (CocoaError::ContextClosed, -32000),
            (CocoaError::Config { message: "bad".into() }, -32603),
        ];
        for (err, code) in cases {
            assert_eq!(JsonRpcResponse::failure(json!(1), &err).error.unwrap().code, code);
        }
    }
}
