//! Upstream blockchain node access.
//!
//! # Data Flow
//! ```text
//! Relay handler (method, params)
//!     → types.rs (JSON-RPC 2.0 envelope, correlation id)
//!     → client.rs (primary → backup 1 → backup 2 → ...)
//!     → first 2xx body, or last failure
//! ```
//!
//! # Constraints
//! - At most one endpoint produces the final response
//! - Transport errors never abort the chain
//! - No timeouts unless configured

pub mod client;
pub mod types;

pub use client::RpcClient;
pub use types::{BlockchainError, BlockchainResult, JsonRpcRequest, JsonRpcResponse};
