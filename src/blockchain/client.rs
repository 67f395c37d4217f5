//! Upstream JSON-RPC client with ordered fallback.
//!
//! # Responsibilities
//! - Hold the ordered endpoint list (primary first, then backups)
//! - Post one envelope per call to each endpoint in turn
//! - Stop at the first 2xx response
//! - Report the last observed failure when every endpoint fails
//!
//! There are no retries within an endpoint and no backoff; moving to the
//! next endpoint is the only recovery.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde_json::Value;
use url::Url;

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, JsonRpcRequest, JsonRpcResponse, RequestIds,
};
use crate::config::UpstreamConfig;
use crate::observability::metrics;

/// Relay client over a fixed, ordered list of nodes.
pub struct RpcClient {
    http: reqwest::Client,
    endpoints: ArcSwap<Vec<Url>>,
    ids: RequestIds,
}

impl RpcClient {
    /// Create a client from upstream configuration.
    ///
    /// An unparsable primary is an error; unparsable backups are skipped
    /// with a warning.
    pub fn new(config: &UpstreamConfig) -> BlockchainResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| BlockchainError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let endpoints = parse_endpoints(config)?;
        tracing::info!(
            primary = %endpoints[0],
            backups = endpoints.len() - 1,
            "RPC client initialized"
        );

        Ok(Self {
            http,
            endpoints: ArcSwap::from_pointee(endpoints),
            ids: RequestIds::new(),
        })
    }

    /// Client for a single endpoint with no backups.
    pub fn single(endpoint: &str) -> BlockchainResult<Self> {
        Self::new(&UpstreamConfig {
            primary: endpoint.to_string(),
            backups: Vec::new(),
            ..Default::default()
        })
    }

    /// Replace the endpoint list. Calls already in flight finish on the old list.
    pub fn set_endpoints(&self, config: &UpstreamConfig) -> BlockchainResult<()> {
        let endpoints = parse_endpoints(config)?;
        tracing::info!(
            primary = %endpoints[0],
            backups = endpoints.len() - 1,
            "RPC endpoints updated"
        );
        self.endpoints.store(Arc::new(endpoints));
        Ok(())
    }

    /// Current endpoints in the order they are consulted.
    pub fn endpoints(&self) -> Arc<Vec<Url>> {
        self.endpoints.load_full()
    }

    /// Relay one call. Returns the body of the first endpoint answering 2xx.
    pub async fn call(&self, method: &str, params: Value) -> BlockchainResult<Value> {
        let envelope = JsonRpcRequest::new(method, params, self.ids.next());
        let endpoints = self.endpoints.load_full();

        let mut last_failure: Option<(u16, String)> = None;
        let mut last_transport_error: Option<String> = None;

        for (idx, endpoint) in endpoints.iter().enumerate() {
            let started = Instant::now();
            let host = endpoint.host_str().unwrap_or("unknown");

            tracing::debug!(
                endpoint = %endpoint,
                endpoint_idx = idx,
                method = %envelope.method,
                id = envelope.id,
                "Forwarding RPC call"
            );

            let response = match self.http.post(endpoint.clone()).json(&envelope).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, endpoint_idx = idx, error = %e, "RPC transport error, trying next endpoint");
                    metrics::record_upstream_attempt(host, "transport_error", started);
                    last_transport_error = Some(e.to_string());
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                metrics::record_upstream_attempt(host, "success", started);
                if idx > 0 {
                    tracing::info!(endpoint = %endpoint, endpoint_idx = idx, "RPC call served by backup endpoint");
                }
                let bytes = response.bytes().await.map_err(|e| {
                    BlockchainError::InvalidResponse(format!("failed to read body from {}: {}", endpoint, e))
                })?;
                return serde_json::from_slice(&bytes).map_err(|e| {
                    BlockchainError::InvalidResponse(format!("non-JSON body from {}: {}", endpoint, e))
                });
            }

            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %endpoint, endpoint_idx = idx, status = %status, "RPC endpoint returned error status, trying next endpoint");
            metrics::record_upstream_attempt(host, "http_error", started);
            last_failure = Some((status.as_u16(), body));
        }

        let (status, body) = match (last_failure, last_transport_error) {
            (Some(failure), _) => failure,
            (None, Some(error)) => (502, error),
            (None, None) => (502, "no RPC endpoints configured".to_string()),
        };
        tracing::error!(status, attempts = endpoints.len(), "All RPC endpoints failed");
        Err(BlockchainError::AllEndpointsFailed { status, body })
    }

    /// Relay one call and unwrap the JSON-RPC `result` member.
    pub async fn call_result(&self, method: &str, params: Value) -> BlockchainResult<Value> {
        let body = self.call(method, params).await?;
        let response: JsonRpcResponse = serde_json::from_value(body)
            .map_err(|e| BlockchainError::InvalidResponse(e.to_string()))?;
        response.into_result()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoints: Vec<String> = self.endpoints.load().iter().map(Url::to_string).collect();
        f.debug_struct("RpcClient")
            .field("endpoints", &endpoints)
            .finish()
    }
}

fn parse_endpoints(config: &UpstreamConfig) -> BlockchainResult<Vec<Url>> {
    let primary: Url = config.primary.parse().map_err(|e| {
        BlockchainError::Config(format!("Invalid RPC URL '{}': {}", config.primary, e))
    })?;

    let mut endpoints = vec![primary];
    for url_str in &config.backups {
        match url_str.parse() {
            Ok(url) => endpoints.push(url),
            Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid backup RPC URL"),
        }
    }
    Ok(endpoints)
}
