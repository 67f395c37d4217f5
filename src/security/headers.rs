//! Client identification and CORS headers.
//!
//! # Responsibilities
//! - Derive the rate-limit identity of a request
//! - Build the permissive CORS preflight response
//!
//! # Design Decisions
//! - `x-forwarded-for` is trusted only when configured; it is not verified
//! - The first entry of a forwarded chain is the originating client
//! - Requests without any identity share the `unknown` bucket

use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};

/// Identity used when neither the header nor the peer address is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

/// Rate-limit identity attached to accepted requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientId(pub String);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the client identity of a request.
pub fn client_id<B>(request: &Request<B>, trust_forwarded_for: bool) -> ClientId {
    if trust_forwarded_for {
        return ClientId(forwarded_for(request.headers()).unwrap_or(UNKNOWN_CLIENT).to_string());
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    ClientId(peer.unwrap_or_else(|| UNKNOWN_CLIENT.to_string()))
}

/// First non-empty entry of `x-forwarded-for`.
fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// 204 preflight response carrying the three CORS headers.
pub fn preflight_response(allow_origin: &HeaderValue) -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin.clone()),
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS)),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS)),
        ],
    )
        .into_response()
}
