//! Client for the RPC relay's HTTP surface.

mod client;

pub use client::{HealthStatus, RelayClient, RelayReply};
