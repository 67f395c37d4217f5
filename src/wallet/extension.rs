//! Bridge to a callback-style wallet extension.
//!
//! The extension takes a request plus a one-shot callback and reports back
//! whenever the user approves or declines. [`ExtensionSigner`] turns that
//! into a future. Nothing is retried and there is no timeout: the future
//! resolves when the extension answers, or fails with
//! [`WalletError::Cancelled`] if it drops the callback unanswered.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::wallet::signer::{
    BroadcastRequest, SignMessageRequest, SignerResponse, TransferRequest, WalletError,
    WalletResult, WalletSigner,
};

/// What the extension hands to the callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExtensionResponse {
    pub fn into_result(self) -> WalletResult<SignerResponse> {
        if self.success {
            return Ok(SignerResponse {
                result: self.result.unwrap_or(Value::Null),
                message: self.message,
            });
        }
        let reason = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "declined by wallet".to_string());
        Err(WalletError::Rejected(reason))
    }
}

pub type ExtensionCallback = Box<dyn FnOnce(ExtensionResponse) + Send>;

/// The callback API exposed by a wallet extension.
pub trait WalletExtension: Send + Sync {
    fn request_transfer(&self, request: &TransferRequest, callback: ExtensionCallback);

    fn request_sign_buffer(&self, request: &SignMessageRequest, callback: ExtensionCallback);

    fn request_broadcast(&self, request: &BroadcastRequest, callback: ExtensionCallback);
}

/// [`WalletSigner`] backed by an injected extension, if one is present.
#[derive(Clone, Default)]
pub struct ExtensionSigner {
    extension: Option<Arc<dyn WalletExtension>>,
}

impl ExtensionSigner {
    pub fn new(extension: Arc<dyn WalletExtension>) -> Self {
        Self {
            extension: Some(extension),
        }
    }

    /// A signer with no extension behind it. Every call fails with
    /// [`WalletError::NotInstalled`].
    pub fn detached() -> Self {
        Self { extension: None }
    }

    pub fn is_installed(&self) -> bool {
        self.extension.is_some()
    }

    async fn dispatch<F>(&self, operation: &'static str, issue: F) -> WalletResult<SignerResponse>
    where
        F: FnOnce(&dyn WalletExtension, ExtensionCallback),
    {
        let extension = self.extension.as_deref().ok_or(WalletError::NotInstalled)?;

        let (tx, rx) = oneshot::channel();
        issue(
            extension,
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        );

        let response = rx.await.map_err(|_| WalletError::Cancelled)?;
        let outcome = response.into_result();
        match &outcome {
            Ok(_) => tracing::debug!(operation, "Wallet extension approved request"),
            Err(e) => tracing::info!(operation, error = %e, "Wallet extension request failed"),
        }
        outcome
    }
}

impl WalletSigner for ExtensionSigner {
    fn name(&self) -> &'static str {
        "extension"
    }

    fn transfer<'a>(&'a self, request: &'a TransferRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(self.dispatch("transfer", move |ext, cb| ext.request_transfer(request, cb)))
    }

    fn sign_message<'a>(&'a self, request: &'a SignMessageRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(self.dispatch("sign_message", move |ext, cb| ext.request_sign_buffer(request, cb)))
    }

    fn broadcast<'a>(&'a self, request: &'a BroadcastRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(self.dispatch("broadcast", move |ext, cb| ext.request_broadcast(request, cb)))
    }
}
