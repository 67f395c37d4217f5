//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (resolve client identity)
//!     → rate_limit.rs (check per-client quota for the current bucket)
//!     → Pass to relay handler
//! ```
//!
//! # Design Decisions
//! - Limiter is an explicit service with an injectable clock
//! - Preflight requests bypass the limiter
//! - Rejected requests are never forwarded upstream

pub mod clock;
pub mod headers;
pub mod rate_limit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use headers::ClientId;
pub use rate_limit::RateLimiter;
