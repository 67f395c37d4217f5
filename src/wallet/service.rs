//! OAuth-style signer service client.
//!
//! The user authorizes the service once and the app receives an access
//! token; afterwards operations are posted to the service, which signs and
//! broadcasts them with keys the client never sees.

use futures_util::future::BoxFuture;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use url::Url;

use crate::wallet::signer::{
    BroadcastRequest, SignMessageRequest, SignerResponse, TransferRequest, WalletError,
    WalletResult, WalletSigner,
};

/// Client for a remote signer holding an access token.
#[derive(Clone)]
pub struct SignerServiceClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: String,
}

impl SignerServiceClient {
    pub fn new(base_url: &str, access_token: impl Into<String>) -> WalletResult<Self> {
        let mut base_url: Url = base_url
            .parse()
            .map_err(|e| WalletError::Signer(format!("Invalid signer service URL '{}': {}", base_url, e)))?;
        // `join` treats a base without a trailing slash as a file.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            access_token: access_token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post(&self, path: &str, body: Value) -> WalletResult<SignerResponse> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| WalletError::Signer(format!("Invalid signer path '{}': {}", path, e)))?;

        let response = self
            .http
            .post(url.clone())
            .header(AUTHORIZATION, &self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            let reason = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            tracing::info!(url = %url, status = %status, reason = %reason, "Signer service rejected request");
            return Err(WalletError::Rejected(reason));
        }

        let result = match body {
            Value::Object(mut map) if map.contains_key("result") => map.remove("result").unwrap_or(Value::Null),
            other => other,
        };
        Ok(SignerResponse { result, message: None })
    }
}

impl std::fmt::Debug for SignerServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the access token.
        f.debug_struct("SignerServiceClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl WalletSigner for SignerServiceClient {
    fn name(&self) -> &'static str {
        "signer-service"
    }

    fn transfer<'a>(&'a self, request: &'a TransferRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(self.post("api/broadcast", json!({ "operations": [request.to_operation()] })))
    }

    fn sign_message<'a>(&'a self, request: &'a SignMessageRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(self.post(
            "api/sign_message",
            json!({
                "account": request.account,
                "message": request.message,
                "key_role": request.key_role,
            }),
        ))
    }

    fn broadcast<'a>(&'a self, request: &'a BroadcastRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(self.post("api/broadcast", json!({ "operations": request.operations })))
    }
}
