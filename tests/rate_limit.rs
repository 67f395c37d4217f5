//! Rate limiting and preflight handling over a real listener.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use relay_sdk::RelayClient;
use serde_json::json;

mod common;

/// Buckets are aligned to the minute; avoid starting a burst right before
/// the boundary.
async fn wait_for_fresh_minute() {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let into_minute = secs % 60;
    if into_minute > 50 {
        tokio::time::sleep(Duration::from_secs(61 - into_minute)).await;
    }
}

#[tokio::test]
async fn test_fifty_first_request_is_rejected() {
    let upstream = common::start_mock_upstream(200, r#"{"result":true}"#).await;
    let (url, shutdown) = common::start_relay(common::relay_config(upstream.url(), vec![])).await;
    wait_for_fresh_minute().await;

    let client = RelayClient::new(&url).with_forwarded_for("203.0.113.7, 10.0.0.1");
    for i in 0..50 {
        let reply = client.call("m", json!([])).await.unwrap();
        assert_eq!(reply.status, 200, "request {} should be accepted", i + 1);
    }

    let reply = client.call("m", json!([])).await.unwrap();
    assert_eq!(reply.status, 429);
    assert_eq!(reply.error(), Some("Too many requests, please try again later."));
    assert_eq!(upstream.hits(), 50, "rejected requests are not forwarded");

    // Another client still has its full quota.
    let other = RelayClient::new(&url).with_forwarded_for("198.51.100.1");
    assert_eq!(other.call("m", json!([])).await.unwrap().status, 200);

    shutdown.trigger();
}

#[tokio::test]
async fn test_preflight_ignores_quota() {
    let upstream = common::start_mock_upstream(200, r#"{"result":true}"#).await;
    let (url, shutdown) = common::start_relay(common::relay_config(upstream.url(), vec![])).await;
    let client = RelayClient::new(&url);

    for _ in 0..60 {
        let res = client.preflight().await.unwrap();
        assert_eq!(res.status(), 204);
        let headers = res.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
        assert_eq!(res.text().await.unwrap(), "");
    }

    assert_eq!(upstream.hits(), 0);
    shutdown.trigger();
}

#[tokio::test]
async fn test_disabled_limiter_accepts_everything() {
    let upstream = common::start_mock_upstream(200, r#"{"result":true}"#).await;
    let mut config = common::relay_config(upstream.url(), vec![]);
    config.rate_limit.enabled = false;
    let (url, shutdown) = common::start_relay(config).await;

    let client = RelayClient::new(&url).with_forwarded_for("203.0.113.9");
    for _ in 0..60 {
        assert_eq!(client.call("m", json!([])).await.unwrap().status, 200);
    }
    shutdown.trigger();
}
