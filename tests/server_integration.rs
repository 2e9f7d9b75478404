//! Integration tests over a real listening socket.
//!
//! These exercise the client identity taken from the connection, which the
//! in-process test server does not provide.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;

use common::{test_config, RecordingTransport};
use nudge::config::Config;
use nudge::{AppState, WebServer};

async fn start_server(config: &Config, transport: &RecordingTransport) -> SocketAddr {
    let state = Arc::new(AppState::new(config, Arc::new(transport.clone())));
    WebServer::new(&config.server, state)
        .unwrap()
        .run_with_addr()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_over_socket() {
    let addr = start_server(&test_config(), &RecordingTransport::new()).await;

    let resp = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_rate_limit_by_peer_address() {
    let mut config = test_config();
    config.limits.max_requests = 2;
    let transport = RecordingTransport::new();
    let addr = start_server(&config, &transport).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // Spoofed proxy headers are ignored by default.
    let resp = client
        .get(format!("http://{}/", addr))
        .header("X-Forwarded-For", "203.0.113.99")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_concurrent_http_triggers() {
    let mut config = test_config();
    config.limits.max_requests = 5;
    let transport = RecordingTransport::new();
    let addr = start_server(&config, &transport).await;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let url = format!("http://{}/", addr);
        handles.push(tokio::spawn(async move {
            client.get(url).send().await.unwrap().status()
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(limited, 15);
    // Two recipients per admitted call.
    assert_eq!(transport.sent().len(), 10);
    assert_eq!(transport.sessions_opened(), transport.sessions_released());
}
