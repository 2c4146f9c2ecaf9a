//! Request pipeline behaviour over real connections.

use std::time::Duration;

use api_server::http::middleware::ClientIp;
use api_server::http::router::api_routes;
use api_server::AppConfig;
use axum::{
    body::Bytes,
    routing::{get, post},
    Extension, Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

async fn boom() -> &'static str {
    panic!("handler bug")
}

fn diagnostic_routes() -> Router {
    Router::new()
        .route(
            "/ip",
            get(|Extension(ClientIp(ip)): Extension<ClientIp>| async move { ip.to_string() }),
        )
        .route("/boom", get(boom))
        .route("/echo", post(|body: Bytes| async move { body.len().to_string() }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "done"
            }),
        )
}

/// Read whatever the server sends within `limit`; `None` if it stays silent.
async fn read_reply(stream: &mut TcpStream, limit: Duration) -> Option<String> {
    let mut buf = [0u8; 1024];
    match tokio::time::timeout(limit, stream.read(&mut buf)).await {
        Ok(Ok(n)) => Some(String::from_utf8_lossy(&buf[..n]).into_owned()),
        Ok(Err(_)) => Some(String::new()),
        Err(_) => None,
    }
}

#[tokio::test]
async fn test_health_payload_and_request_id() {
    let config = common::test_config();
    let (server, addr) = common::start_server(&config, api_routes(&config)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/api/health"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "req-42");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["env"], "test");

    let res = client
        .get(format!("http://{addr}/api/health"))
        .send()
        .await
        .unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap().to_owned();
    assert!(uuid::Uuid::parse_str(&generated).is_ok());

    server.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let config = common::test_config();
    let (server, addr) = common::start_server(&config, api_routes(&config)).await;

    let res = common::client()
        .get(format!("http://{addr}/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    server.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_panic_is_500_and_server_keeps_serving() {
    let config = common::test_config();
    let (server, addr) = common::start_server(&config, diagnostic_routes()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/boom"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "internal server error");

    let res = client
        .get(format!("http://{addr}/live"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    server.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_client_ip_uses_peer_and_trusted_headers() {
    let config = common::test_config();
    let (server, addr) = common::start_server(&config, diagnostic_routes()).await;
    let client = common::client();

    let res = client.get(format!("http://{addr}/ip")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "127.0.0.1");

    let res = client
        .get(format!("http://{addr}/ip"))
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "203.0.113.9");

    server.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_untrusted_proxy_headers_are_ignored() {
    let config = AppConfig {
        trust_proxy_headers: false,
        ..common::test_config()
    };
    let (server, addr) = common::start_server(&config, diagnostic_routes()).await;

    let res = common::client()
        .get(format!("http://{addr}/ip"))
        .header("x-real-ip", "198.51.100.7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "127.0.0.1");

    server.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_idle_timeout_spares_in_flight_request() {
    let config = AppConfig {
        idle_timeout_secs: 1,
        write_timeout_secs: 10,
        ..common::test_config()
    };
    let (server, addr) = common::start_server(&config, diagnostic_routes()).await;

    let res = common::client()
        .get(format!("http://{addr}/slow"))
        .send()
        .await
        .expect("connection survives a handler slower than the idle timeout");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "done");

    server.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_stalled_request_body_hits_read_timeout() {
    let config = AppConfig {
        read_timeout_secs: 1,
        ..common::test_config()
    };
    let (server, addr) = common::start_server(&config, diagnostic_routes()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\nabc")
        .await
        .unwrap();

    let reply = read_reply(&mut stream, Duration::from_secs(5))
        .await
        .expect("server answers once the body stalls");
    assert!(reply.starts_with("HTTP/1.1 400"), "unexpected reply: {reply:?}");

    server.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_stalled_request_head_hits_read_timeout() {
    let config = AppConfig {
        read_timeout_secs: 1,
        ..common::test_config()
    };
    let (server, addr) = common::start_server(&config, diagnostic_routes()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /live HTTP/1.1\r\nHost: loc").await.unwrap();

    let reply = read_reply(&mut stream, Duration::from_secs(5)).await;
    assert!(reply.is_some(), "connection left open after the header read timeout");
    assert!(!reply.unwrap_or_default().contains("200 OK"));

    server.stop(Duration::from_secs(5)).await.unwrap();
}
