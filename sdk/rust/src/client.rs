use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a relay call.
#[derive(Debug, Serialize)]
struct RelayCall<'a> {
    method: &'a str,
    params: &'a Value,
}

/// Status and JSON body of a relay response, successful or not.
#[derive(Debug)]
pub struct RelayReply {
    pub status: StatusCode,
    pub body: Value,
}

impl RelayReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `error` field of a failed reply.
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub endpoints: usize,
    #[serde(default)]
    pub rate_limit_windows: usize,
}

pub struct RelayClient {
    client: Client,
    relay_url: String,
    forwarded_for: Option<String>,
}

impl RelayClient {
    pub fn new(relay_url: &str) -> Self {
        Self {
            client: Client::new(),
            relay_url: relay_url.trim_end_matches('/').to_string(),
            forwarded_for: None,
        }
    }

    /// Send every request with this `x-forwarded-for` value.
    pub fn with_forwarded_for(mut self, client: &str) -> Self {
        self.forwarded_for = Some(client.to_string());
        self
    }

    /// Relay one call. Non-2xx statuses are returned, not turned into errors.
    pub async fn call(&self, method: &str, params: Value) -> Result<RelayReply, reqwest::Error> {
        let body = serde_json::to_vec(&RelayCall {
            method,
            params: &params,
        })
        .unwrap_or_default();
        self.post_raw(body).await
    }

    /// Post an arbitrary body to the relay endpoint.
    pub async fn post_raw(&self, body: impl Into<reqwest::Body>) -> Result<RelayReply, reqwest::Error> {
        let mut req = self
            .client
            .post(format!("{}/api/rpc", self.relay_url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(ref client) = self.forwarded_for {
            req = req.header("x-forwarded-for", client);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(RelayReply { status, body })
    }

    /// Send the CORS preflight.
    pub async fn preflight(&self) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .request(reqwest::Method::OPTIONS, format!("{}/api/rpc", self.relay_url))
            .send()
            .await
    }

    pub async fn health(&self) -> Result<HealthStatus, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .get(format!("{}/health", self.relay_url))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(format!("Relay returned error status {}: {}", status, text).into());
        }
        Ok(serde_json::from_str(&text)?)
    }
}
