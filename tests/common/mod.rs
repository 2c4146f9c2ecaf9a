//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api_server::http::with_pipeline;
use api_server::{AppConfig, Server};
use axum::Router;

/// Config bound to an ephemeral loopback port.
pub fn test_config() -> AppConfig {
    AppConfig {
        env: "test".into(),
        http_addr: "127.0.0.1:0".into(),
        ..AppConfig::default()
    }
}

/// Start a server for `routes` behind the full pipeline and wait for the bind.
pub async fn start_server(config: &AppConfig, routes: Router) -> (Arc<Server>, SocketAddr) {
    let server = Arc::new(Server::new(config, with_pipeline(routes, config)));
    server.start().expect("server starts from idle");
    let addr = tokio::time::timeout(Duration::from_secs(5), server.local_addr())
        .await
        .expect("bind finishes")
        .expect("bind succeeds");
    (server, addr)
}

/// Client without connection pooling or proxies, so nothing lingers between tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
