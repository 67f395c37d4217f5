//! RPC relay library.
//!
//! Accepts `{method, params}` calls on `POST /api/rpc`, applies a per-client
//! quota and forwards each call to an ordered list of JSON-RPC endpoints.
//! The `wallet` module carries the signing bridge used by clients of the relay.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;
pub mod wallet;

pub use config::schema::RelayConfig;
pub use error::RelayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
