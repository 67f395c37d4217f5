//! Network layer.
//!
//! Plain TCP listeners are bound by the caller and handed to
//! [`crate::http::HttpServer::run`]; `tls.rs` loads certificates for
//! [`crate::http::HttpServer::run_tls`].

pub mod tls;
