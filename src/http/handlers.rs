//! Request handlers for the relay surface.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::headers::{preflight_response, ClientId};

/// Inbound call body. Both fields must be present for the call to be relayed.
/// A `method` that is not a string fails deserialization and is answered
/// like any other malformed body.
#[derive(Debug, Deserialize)]
pub struct RelayCall {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl RelayCall {
    /// The method and params, or a 400 when the method is missing or empty
    /// or the params are missing or null. The method is not otherwise checked.
    fn into_parts(self) -> Result<(String, Value), RelayError> {
        match (self.method, self.params) {
            (Some(method), Some(params)) if !method.is_empty() && !params.is_null() => {
                Ok((method, params))
            }
            _ => Err(RelayError::InvalidRequest("Missing method or params".to_string())),
        }
    }
}

/// `POST /api/rpc`
pub async fn relay(
    State(state): State<AppState>,
    Extension(client): Extension<ClientId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let response = match forward(&state, &body).await {
        Ok(upstream) => (StatusCode::OK, Json(upstream)).into_response(),
        Err(e) => {
            tracing::warn!(request_id = %request_id, client = %client, error = %e, "Relay request failed");
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn forward(state: &AppState, body: &[u8]) -> Result<Value, RelayError> {
    let call: RelayCall = serde_json::from_slice(body)
        .map_err(|e| RelayError::Internal(format!("malformed request body: {}", e)))?;
    let (method, params) = call.into_parts()?;

    tracing::debug!(method = %method, "Relaying RPC call");
    Ok(state.rpc.call(&method, params).await?)
}

/// `OPTIONS /api/rpc`
pub async fn preflight(State(state): State<AppState>) -> Response {
    preflight_response(&state.cors_origin)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub endpoints: usize,
    pub rate_limit_windows: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "operational".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: state.rpc.endpoints().len(),
        rate_limit_windows: state.limiter.len(),
    })
}
