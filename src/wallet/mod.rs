//! Wallet operation bridge.
//!
//! Transfers, message signing, and transaction broadcast go through the
//! [`WalletSigner`] capability. Backends:
//!
//! - [`ExtensionSigner`]: a callback-style wallet extension
//! - [`SignerServiceClient`]: an OAuth-style remote signer
//! - [`LocalKeySigner`]: an in-process key, message signing only
//!
//! Callers hold a `&dyn WalletSigner` and never branch on which one it is.

pub mod extension;
pub mod local;
pub mod service;
pub mod signer;

pub use extension::{ExtensionCallback, ExtensionResponse, ExtensionSigner, WalletExtension};
pub use local::LocalKeySigner;
pub use service::SignerServiceClient;
pub use signer::{
    BroadcastRequest, KeyRole, SignMessageRequest, SignerResponse, TransferRequest, WalletError,
    WalletResult, WalletSigner,
};
