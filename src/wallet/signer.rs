//! The signer capability and the operations it carries.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Which account authority an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    #[default]
    Posting,
    Active,
    Memo,
}

impl std::fmt::Display for KeyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyRole::Posting => "posting",
            KeyRole::Active => "active",
            KeyRole::Memo => "memo",
        })
    }
}

/// Token transfer between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    /// Amount with precision and symbol, e.g. `"1.000 HIVE"`.
    pub amount: String,
    #[serde(default)]
    pub memo: String,
}

impl TransferRequest {
    /// The transfer as a `[name, payload]` chain operation.
    pub fn to_operation(&self) -> Value {
        json!(["transfer", {
            "from": self.from,
            "to": self.to,
            "amount": self.amount,
            "memo": self.memo,
        }])
    }
}

/// Sign an arbitrary message with one of the account's keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignMessageRequest {
    pub account: String,
    pub message: String,
    #[serde(default)]
    pub key_role: KeyRole,
}

/// Sign and broadcast a list of chain operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub account: String,
    pub operations: Vec<Value>,
    #[serde(default)]
    pub key_role: KeyRole,
}

/// What a signer backend reports on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerResponse {
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Errors from signer backends.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No wallet extension is available to handle the request.
    #[error("Wallet extension is not installed")]
    NotInstalled,

    /// The signer refused or failed the operation.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The signer went away without answering.
    #[error("Request cancelled before the signer answered")]
    Cancelled,

    /// Local key handling or request construction failed.
    #[error("Signer error: {0}")]
    Signer(String),

    /// The signer service could not be reached.
    #[error("Signer transport error: {0}")]
    Transport(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

/// A backend able to perform wallet operations on behalf of a user.
///
/// Implementations hold keys or talk to something that does; callers only
/// see the outcome.
pub trait WalletSigner: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn transfer<'a>(&'a self, request: &'a TransferRequest) -> BoxFuture<'a, WalletResult<SignerResponse>>;

    fn sign_message<'a>(&'a self, request: &'a SignMessageRequest) -> BoxFuture<'a, WalletResult<SignerResponse>>;

    fn broadcast<'a>(&'a self, request: &'a BroadcastRequest) -> BoxFuture<'a, WalletResult<SignerResponse>>;
}
