//! Per-client rate limiting over fixed time buckets.
//!
//! Each client gets one counter per window (one minute by default). Counters
//! live only in this process, so under several relay instances the quota is
//! enforced per instance.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::error::RelayError;
use crate::observability::metrics;
use crate::security::clock::{Clock, SystemClock};
use crate::security::headers::{client_id, ClientId};

/// Counter for one client in one bucket.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    /// When the first request of this window was seen.
    timestamp: Duration,
}

/// In-memory rate limiter keyed by (client, bucket).
pub struct RateLimiter {
    windows: DashMap<(String, u64), Window>,
    max_requests: AtomicU32,
    enabled: bool,
    trust_forwarded_for: bool,
    window: Duration,
    retention: Duration,
    sweep_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: AtomicU32::new(config.max_requests),
            enabled: config.enabled,
            trust_forwarded_for: config.trust_forwarded_for,
            window: Duration::from_secs(config.window_secs.max(1)),
            retention: Duration::from_secs(config.retention_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
            clock,
        }
    }

    /// Admit or reject one request from `client`. Accepted requests are
    /// counted; rejected ones are not.
    pub fn check(&self, client: &str) -> Result<(), RelayError> {
        if !self.enabled {
            return Ok(());
        }

        let now = self.clock.now();
        let bucket = now.as_secs() / self.window.as_secs();
        let max = self.max_requests.load(Ordering::Relaxed);

        // The entry guard holds the shard lock across the read and the write.
        let mut window = self
            .windows
            .entry((client.to_string(), bucket))
            .or_insert(Window { count: 0, timestamp: now });

        if window.count >= max {
            let count = window.count;
            drop(window);
            tracing::warn!(client = %client, bucket, count, "Rate limit exceeded");
            metrics::record_rate_limited();
            return Err(RelayError::RateLimited);
        }

        window.count += 1;
        Ok(())
    }

    /// Drop windows older than the retention period. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let retention = self.retention;
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_sub(w.timestamp) <= retention);
        let remaining = self.windows.len();
        metrics::record_rate_limit_windows(remaining);
        before.saturating_sub(remaining)
    }

    /// Periodically sweep until shutdown is signalled.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let start = tokio::time::Instant::now() + self.sweep_interval;
        let mut ticker = tokio::time::interval_at(start, self.sweep_interval);

        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            retention_secs = self.retention.as_secs(),
            "Rate limit sweeper starting"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    tracing::debug!(removed, remaining = self.len(), "Swept rate limit windows");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Change the quota for subsequent checks.
    pub fn set_max_requests(&self, max_requests: u32) {
        self.max_requests.store(max_requests, Ordering::Relaxed);
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests.load(Ordering::Relaxed)
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    /// Number of tracked windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Middleware applying the limiter. Preflight requests are never limited.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let client = client_id(&request, limiter.trusts_forwarded_for());
    match limiter.check(&client.0) {
        Ok(()) => {
            request.extensions_mut().insert::<ClientId>(client);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
