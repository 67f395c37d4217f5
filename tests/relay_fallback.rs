//! End-to-end relay behaviour against mock upstreams.

use std::time::Duration;

use relay_sdk::RelayClient;
use serde_json::json;

mod common;

const OK_BODY: &str = r#"{"jsonrpc":"2.0","result":{"head_block_number":42},"id":1}"#;

#[tokio::test]
async fn test_backup_serves_when_primary_fails() {
    let primary = common::start_mock_upstream(503, r#"{"error":"overloaded"}"#).await;
    let backup = common::start_mock_upstream(200, OK_BODY).await;
    let spare = common::start_mock_upstream(200, OK_BODY).await;

    let config = common::relay_config(primary.url(), vec![backup.url(), spare.url()]);
    let (url, shutdown) = common::start_relay(config).await;

    let reply = RelayClient::new(&url)
        .call("condenser_api.get_dynamic_global_properties", json!([]))
        .await
        .unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, serde_json::from_str::<serde_json::Value>(OK_BODY).unwrap());
    assert_eq!(primary.hits(), 1);
    assert_eq!(backup.hits(), 1);
    assert_eq!(spare.hits(), 0, "later backups are not consulted after a success");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_primary_falls_through() {
    let backup = common::start_mock_upstream(200, OK_BODY).await;
    let config = common::relay_config(common::closed_port_url().await, vec![backup.url()]);
    let (url, shutdown) = common::start_relay(config).await;

    let reply = RelayClient::new(&url).call("m", json!({})).await.unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["result"]["head_block_number"], 42);
    shutdown.trigger();
}

#[tokio::test]
async fn test_all_endpoints_failing_returns_last_status() {
    let primary = common::start_mock_upstream(500, "primary down").await;
    let backup = common::start_mock_upstream(503, "backup down").await;
    let config = common::relay_config(primary.url(), vec![backup.url()]);
    let (url, shutdown) = common::start_relay(config).await;

    let reply = RelayClient::new(&url).call("m", json!([])).await.unwrap();

    assert_eq!(reply.status, 503);
    assert_eq!(reply.error(), Some("All RPC endpoints failed"));
    assert_eq!(reply.body["details"], "backup down");
    assert_eq!(primary.hits(), 1);
    assert_eq!(backup.hits(), 1);
    shutdown.trigger();
}

#[tokio::test]
async fn test_forwarded_envelope() {
    let upstream = common::start_programmable_upstream(|request| async move {
        (200, json!({"jsonrpc": "2.0", "result": request, "id": 1}).to_string())
    })
    .await;
    let (url, shutdown) = common::start_relay(common::relay_config(upstream.url(), vec![])).await;

    let reply = RelayClient::new(&url)
        .call("bridge.get_account_posts", json!({"account": "alice", "sort": "blog"}))
        .await
        .unwrap();

    let forwarded = &reply.body["result"];
    assert_eq!(forwarded["jsonrpc"], "2.0");
    assert_eq!(forwarded["method"], "bridge.get_account_posts");
    assert_eq!(forwarded["params"], json!({"account": "alice", "sort": "blog"}));
    assert!(forwarded["id"].is_u64());
    shutdown.trigger();
}

#[tokio::test]
async fn test_invalid_requests_never_reach_upstream() {
    let upstream = common::start_mock_upstream(200, OK_BODY).await;
    let (url, shutdown) = common::start_relay(common::relay_config(upstream.url(), vec![])).await;
    let client = RelayClient::new(&url);

    let reply = client.post_raw(r#"{"method":"condenser_api.get_accounts"}"#).await.unwrap();
    assert_eq!(reply.status, 400);
    assert_eq!(reply.error(), Some("Missing method or params"));

    let reply = client.post_raw(r#"{"params":[]}"#).await.unwrap();
    assert_eq!(reply.status, 400);

    let reply = client.post_raw("this is not json").await.unwrap();
    assert_eq!(reply.status, 500);
    assert_eq!(reply.error(), Some("Internal server error"));

    assert_eq!(upstream.hits(), 0);
    shutdown.trigger();
}

#[tokio::test]
async fn test_hot_reload_switches_endpoints() {
    let old = common::start_mock_upstream(200, r#"{"result":"old"}"#).await;
    let new = common::start_mock_upstream(200, r#"{"result":"new"}"#).await;

    let config = common::relay_config(old.url(), vec![]);
    let ((url, shutdown), updates) = common::start_relay_with_updates(config.clone()).await;
    let client = RelayClient::new(&url);

    assert_eq!(client.call("m", json!([])).await.unwrap().body["result"], "old");

    let mut updated = config;
    updated.upstream.primary = new.url();
    updates.send(updated).unwrap();

    let mut served_by_new = false;
    for _ in 0..50 {
        if client.call("m", json!([])).await.unwrap().body["result"] == "new" {
            served_by_new = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(served_by_new, "reloaded endpoint was never used");
    shutdown.trigger();
}

#[tokio::test]
async fn test_health_endpoint() {
    let upstream = common::start_mock_upstream(200, OK_BODY).await;
    let config = common::relay_config(upstream.url(), vec![common::closed_port_url().await]);
    let (url, shutdown) = common::start_relay(config).await;

    let health = RelayClient::new(&url).health().await.unwrap();

    assert_eq!(health.status, "operational");
    assert_eq!(health.endpoints, 2);
    shutdown.trigger();
}
