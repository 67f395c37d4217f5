//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the relay, preflight and health handlers
//! - Wire up middleware (tracing, request ID, body limit, CORS, rate limit)
//! - Bind the server to a plain or TLS listener
//! - Run the rate-limit sweeper for the lifetime of the server
//! - Apply hot-reloaded configuration to the running relay

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::blockchain::{BlockchainResult, RpcClient};
use crate::config::RelayConfig;
use crate::http::handlers;
use crate::lifecycle::shutdown;
use crate::security::clock::{Clock, SystemClock};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Path of the relay endpoint.
pub const RELAY_PATH: &str = "/api/rpc";

/// Time in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rpc: Arc<RpcClient>,
    pub limiter: Arc<RateLimiter>,
    pub cors_origin: HeaderValue,
}

impl AppState {
    /// Apply the hot-reloadable parts of a new configuration.
    pub fn apply(&self, config: &RelayConfig) {
        if let Err(e) = self.rpc.set_endpoints(&config.upstream) {
            tracing::error!(error = %e, "Rejected endpoint update, keeping previous endpoints");
        }
        self.limiter.set_max_requests(config.rate_limit.max_requests);

        tracing::info!(
            endpoints = self.rpc.endpoints().len(),
            max_requests = config.rate_limit.max_requests,
            "Configuration reloaded"
        );
    }
}

/// HTTP server for the RPC relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> BlockchainResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a server whose rate limiter reads time from `clock`.
    pub fn with_clock(config: RelayConfig, clock: Arc<dyn Clock>) -> BlockchainResult<Self> {
        let rpc = Arc::new(RpcClient::new(&config.upstream)?);
        let limiter = Arc::new(RateLimiter::with_clock(&config.rate_limit, clock));
        let cors_origin = HeaderValue::from_str(&config.security.cors_allow_origin)
            .unwrap_or_else(|_| HeaderValue::from_static("*"));

        let state = AppState {
            rpc,
            limiter,
            cors_origin,
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let limiter = state.limiter.clone();
        let cors_origin = state.cors_origin.clone();

        // The body limit wraps POST only; preflight answers whatever the body.
        let relay = post(handlers::relay)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .options(handlers::preflight);

        Router::new()
            .route(RELAY_PATH, relay)
            .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(SetResponseHeaderLayer::if_not_present(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                cors_origin,
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let background = self.spawn_background(config_updates, &shutdown);
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        background.finish().await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let background = self.spawn_background(config_updates, &shutdown);

        let handle = Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown::wait(shutdown).await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        background.finish().await;
        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn spawn_background(
        &self,
        config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        shutdown: &broadcast::Receiver<()>,
    ) -> Background {
        if self.config.rate_limit.trust_forwarded_for {
            tracing::warn!(
                "Rate limiting keys on x-forwarded-for; the header is client-controlled unless set by a trusted proxy"
            );
        }

        let sweeper = self.config.rate_limit.enabled.then(|| {
            tokio::spawn(self.state.limiter.clone().run_sweeper(shutdown.resubscribe()))
        });
        let reloader = tokio::spawn(apply_updates(
            self.state.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        Background { sweeper, reloader }
    }

    /// A clone of the router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared state, exposed for inspection.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

struct Background {
    sweeper: Option<tokio::task::JoinHandle<()>>,
    reloader: tokio::task::JoinHandle<()>,
}

impl Background {
    async fn finish(self) {
        if let Some(sweeper) = self.sweeper {
            let _ = sweeper.await;
        }
        self.reloader.abort();
    }
}

async fn apply_updates(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<RelayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => state.apply(&config),
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
