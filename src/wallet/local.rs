//! Locally held key, for message signing in tooling and development.
//!
//! The key signs arbitrary messages only. Chain transactions need the
//! node's reference block and chain id, which this signer does not track,
//! so transfers and broadcasts are refused and belong to the other backends.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables or arguments
//! - Keys are never logged or serialized

use alloy::primitives::{hex, Address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use futures_util::future::BoxFuture;
use serde_json::json;

use crate::wallet::signer::{
    BroadcastRequest, SignMessageRequest, SignerResponse, TransferRequest, WalletError,
    WalletResult, WalletSigner,
};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "RELAY_SIGNER_PRIVATE_KEY";

/// Sign-only backend over an in-process secp256k1 key.
#[derive(Clone)]
pub struct LocalKeySigner {
    signer: PrivateKeySigner,
}

impl LocalKeySigner {
    /// Create a signer from a hex-encoded private key (with or without 0x).
    pub fn from_private_key(private_key_hex: &str) -> WalletResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| WalletError::Signer(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Local signer initialized");
        Ok(Self { signer })
    }

    /// Load the key from `RELAY_SIGNER_PRIVATE_KEY`.
    pub fn from_env() -> WalletResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            WalletError::Signer(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
        })?;
        Self::from_private_key(&private_key)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_bytes(&self, bytes: &[u8]) -> WalletResult<String> {
        let signature = self
            .signer
            .sign_message(bytes)
            .await
            .map_err(|e| WalletError::Signer(format!("Signing failed: {}", e)))?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }
}

fn cannot_broadcast() -> WalletError {
    WalletError::Signer("local key cannot broadcast".to_string())
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("address", &self.signer.address())
            .finish()
    }
}

impl WalletSigner for LocalKeySigner {
    fn name(&self) -> &'static str {
        "local-key"
    }

    fn transfer<'a>(&'a self, _request: &'a TransferRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(async { Err(cannot_broadcast()) })
    }

    fn sign_message<'a>(&'a self, request: &'a SignMessageRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(async move {
            let signature = self.sign_bytes(request.message.as_bytes()).await?;
            Ok(SignerResponse {
                result: json!({
                    "account": request.account,
                    "address": self.address().to_string(),
                    "signature": signature,
                }),
                message: None,
            })
        })
    }

    fn broadcast<'a>(&'a self, _request: &'a BroadcastRequest) -> BoxFuture<'a, WalletResult<SignerResponse>> {
        Box::pin(async { Err(cannot_broadcast()) })
    }
}
