//! JSON-RPC envelope and error definitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Outbound JSON-RPC 2.0 request. Built fresh for every relayed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Inbound JSON-RPC 2.0 response. The relay passes bodies through verbatim;
/// this type is for callers that want the `result` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    /// `result`, or the `error` object as a [`BlockchainError::Rpc`].
    pub fn into_result(self) -> BlockchainResult<Value> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(BlockchainError::Rpc {
                code: err.code,
                message: err.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Correlation ids derived from the current time in milliseconds.
///
/// Ids never repeat or go backwards, even for calls in the same millisecond
/// or across a wall-clock step back.
#[derive(Debug, Default)]
pub struct RequestIds {
    last: AtomicU64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.next_at(now)
    }

    fn next_at(&self, now_millis: u64) -> u64 {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Errors that can occur while relaying to upstream nodes.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Every endpoint failed; carries the last observed status and body.
    #[error("All RPC endpoints failed (last status {status})")]
    AllEndpointsFailed { status: u16, body: String },

    /// An endpoint answered 2xx with a body that is not JSON.
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    /// The endpoint list is empty or unusable.
    #[error("RPC configuration error: {0}")]
    Config(String),

    /// The JSON-RPC response carried an `error` object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let req = JsonRpcRequest::new("condenser_api.get_accounts", json!([["alice"]]), 42);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "condenser_api.get_accounts",
                "params": [["alice"]],
                "id": 42,
            })
        );
    }

    #[test]
    fn test_ids_are_strictly_increasing() {
        let ids = RequestIds::new();
        assert_eq!(ids.next_at(1_000), 1_000);
        assert_eq!(ids.next_at(1_000), 1_001);
        assert_eq!(ids.next_at(900), 1_002);
        assert_eq!(ids.next_at(5_000), 5_000);
    }

    #[test]
    fn test_ids_track_wall_clock() {
        let ids = RequestIds::new();
        let first = ids.next();
        assert!(first > 1_600_000_000_000);
        assert!(ids.next() > first);
    }

    #[test]
    fn test_response_into_result() {
        let ok: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "result": {"head": 7}, "id": 1})).unwrap();
        assert_eq!(ok.into_result().unwrap(), json!({"head": 7}));

        let err: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "method not found"},
            "id": 1
        }))
        .unwrap();
        assert!(matches!(
            err.into_result(),
            Err(BlockchainError::Rpc { code: -32601, .. })
        ));
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::AllEndpointsFailed {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "All RPC endpoints failed (last status 503)");
    }
}
