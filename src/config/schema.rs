//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the RPC relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Upstream blockchain nodes (primary + ordered backups).
    pub upstream: UpstreamConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Inbound request hardening and CORS.
    pub security: SecurityConfig,

    /// Wallet operation bridge settings.
    pub wallet: WalletConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Primary JSON-RPC endpoint, always tried first.
    pub primary: String,

    /// Backup endpoints, tried in order after the primary fails.
    pub backups: Vec<String>,

    /// Per-attempt timeout in seconds. `None` leaves each attempt bounded
    /// only by the transport.
    pub timeout_secs: Option<u64>,

    /// User-Agent sent to upstream nodes.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            primary: "https://api.hive.blog".to_string(),
            backups: vec![
                "https://api.deathwing.me".to_string(),
                "https://api.openhive.network".to_string(),
                "https://rpc.mahdiyari.info".to_string(),
            ],
            timeout_secs: None,
            user_agent: concat!("rpc-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Primary followed by backups, in the order they are consulted.
    pub fn ordered_endpoints(&self) -> Vec<String> {
        std::iter::once(self.primary.clone())
            .chain(self.backups.iter().cloned())
            .collect()
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum accepted requests per client per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Windows older than this are removed by the sweeper.
    pub retention_secs: u64,

    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,

    /// Identify clients by `x-forwarded-for`. The header is supplied by the
    /// client or an intermediary and is not verified; disable this when the
    /// relay is not behind a trusted proxy so the peer address is used.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 50,
            window_secs: 60,
            retention_secs: 600,
            sweep_interval_secs: 600,
            trust_forwarded_for: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Value of `Access-Control-Allow-Origin` on every response.
    pub cors_allow_origin: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
            cors_allow_origin: "*".to_string(),
        }
    }
}

/// Wallet bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Base URL of the OAuth-style signer service.
    pub signer_service_url: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            signer_service_url: "https://hivesigner.com".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.retention_secs, 600);
        assert_eq!(config.rate_limit.sweep_interval_secs, 600);
        assert_eq!(config.upstream.backups.len(), 3);
        assert!(config.upstream.timeout_secs.is_none());
    }

    #[test]
    fn test_ordered_endpoints_primary_first() {
        let upstream = UpstreamConfig {
            primary: "http://a".into(),
            backups: vec!["http://b".into(), "http://c".into()],
            ..Default::default()
        };
        assert_eq!(upstream.ordered_endpoints(), vec!["http://a", "http://b", "http://c"]);
    }

    #[test]
    fn test_partial_toml() {
        let config: RelayConfig = toml::from_str(
            r#"
            [rate_limit]
            max_requests = 5

            [upstream]
            primary = "http://127.0.0.1:8545"
            backups = []
            "#,
        )
        .unwrap();
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(config.upstream.backups.is_empty());
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
