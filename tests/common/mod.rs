//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use hls_proxy::{router, AppState, ProxyConfig};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Serve `app` as a mock upstream on an ephemeral port.
pub async fn start_upstream(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Defaults with a fixed public origin so rewritten links are predictable.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.server.public_origin = Some("https://proxy.example".into());
    config
}

/// `/api/proxy?url=<encoded target>` plus any extra query.
pub fn proxy_uri(target: &str, extra: &str) -> String {
    format!("/api/proxy?url={}{}", urlencoding::encode(target), extra)
}

pub async fn send(config: ProxyConfig, request: Request<Body>) -> Response<Body> {
    router(AppState::new(config)).oneshot(request).await.unwrap()
}

pub async fn get(config: ProxyConfig, uri: &str) -> Response<Body> {
    send(config, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
