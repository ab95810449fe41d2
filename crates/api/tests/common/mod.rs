//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use futures::StreamExt;
use http_body_util::BodyExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use iotgw_api::config::ServerConfig;
use iotgw_api::router::{build_data_router, build_live_router};
use iotgw_api::state::AppState;
use iotgw_api::ws::KeepaliveConfig;
use iotgw_core::RuleSet;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build a test `ServerConfig` with safe defaults and no API key.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        data_port: 0,
        ui_port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        api_key: None,
        rules_path: PathBuf::from("rules.json"),
        history_capacity: 100,
        keepalive: KeepaliveConfig::default(),
    }
}

/// `temperature` must stay within [-10, 40].
pub fn test_rules() -> RuleSet {
    RuleSet::from_bounds([("temperature", (-10.0, 40.0))]).unwrap()
}

pub fn build_test_state(config: ServerConfig) -> AppState {
    AppState::new(config, test_rules())
}

pub fn data_app(state: &AppState) -> Router {
    build_data_router(state.clone(), &state.config)
}

pub fn live_app(state: &AppState) -> Router {
    build_live_router(state.clone(), &state.config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// POST a raw body with extra headers.
pub async fn post(app: Router, uri: &str, headers: &[(&str, &str)], body: &str) -> Response<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve the live-feed router on an ephemeral port.
pub async fn spawn_live_server(state: &AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = live_app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn connect(addr: SocketAddr) -> WsClient {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    client
}

/// Read frames until the next text frame and parse it as JSON.
pub async fn next_json(client: &mut WsClient) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended before a text frame: {other:?}"),
            }
        }
    })
    .await
    .expect("no text frame within 5s")
}

/// Poll the hub until it reports `expected` sessions.
pub async fn wait_for_sessions(state: &AppState, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.hub.session_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("hub never reached {expected} sessions"));
}
