//! Error surface of the relay endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::blockchain::BlockchainError;

/// Outcome of a relay request that did not succeed.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request body lacks `method` or `params`.
    #[error("{0}")]
    InvalidRequest(String),

    /// The client exceeded its quota for the current window.
    #[error("Too many requests, please try again later.")]
    RateLimited,

    /// Every upstream endpoint failed. Carries the last observed status.
    #[error("All RPC endpoints failed")]
    Upstream { status: StatusCode, body: String },

    /// Anything else. The detail is logged, never returned to the client.
    #[error("Internal server error")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::Upstream { status, .. } => *status,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BlockchainError> for RelayError {
    fn from(err: BlockchainError) -> Self {
        match err {
            BlockchainError::AllEndpointsFailed { status, body } => RelayError::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            },
            other => RelayError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            RelayError::Upstream { status, body } => json!({
                "error": self.to_string(),
                "status": status.as_u16(),
                "details": body,
            }),
            RelayError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal relay error");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let res = RelayError::RateLimited.into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body_json(res).await["error"],
            "Too many requests, please try again later."
        );
    }

    #[tokio::test]
    async fn test_upstream_mirrors_status() {
        let err = RelayError::from(BlockchainError::AllEndpointsFailed {
            status: 503,
            body: "overloaded".into(),
        });
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(res).await;
        assert_eq!(body["status"], 503);
        assert_eq!(body["details"], "overloaded");
        assert_eq!(body["error"], "All RPC endpoints failed");
    }

    #[tokio::test]
    async fn test_internal_hides_detail() {
        let res = RelayError::Internal("secret stack trace".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[test]
    fn test_invalid_request_is_400() {
        assert_eq!(
            RelayError::InvalidRequest("Missing method or params".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
