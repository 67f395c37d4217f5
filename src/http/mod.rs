//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, body limit, CORS origin)
//!     → security::rate_limit (per-client quota, OPTIONS exempt)
//!     → handlers.rs (validate {method, params})
//!     → blockchain::client (primary, then backups in order)
//!     → JSON response or mapped error status
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer, RELAY_PATH};
