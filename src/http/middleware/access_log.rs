//! Structured access logging.
//!
//! One `http_request` event per completed request with `method`, `path`,
//! `status`, `request_id`, `duration_ms` and `client_ip`.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::http::middleware::client_ip::ClientIp;
use crate::http::request::RequestIdExt;

pub async fn access_log(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let request_id = req.request_id().to_owned();
    let client_ip = req
        .extensions()
        .get::<ClientIp>()
        .map(|ClientIp(ip)| ip.to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        request_id = %request_id,
        duration_ms = start.elapsed().as_millis() as u64,
        client_ip = %client_ip,
        "http_request"
    );

    response
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::http::build_router;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn request_events(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
                .filter(|event| event["fields"]["message"] == "http_request")
                .collect()
        }
    }

    #[tokio::test]
    async fn one_record_per_request_and_none_for_liveness() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = build_router(&AppConfig::default());
        let res = app
            .clone()
            .oneshot(
                Request::get("/api/health")
                    .header("x-request-id", "log-me")
                    .header("x-real-ip", "198.51.100.7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        let res = app
            .oneshot(Request::get("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        let events = captured.request_events();
        assert_eq!(events.len(), 1, "events: {events:?}");

        let fields = &events[0]["fields"];
        assert_eq!(fields["method"], "GET");
        assert_eq!(fields["path"], "/api/health");
        assert_eq!(fields["status"], 200);
        assert_eq!(fields["request_id"], "log-me");
        assert_eq!(fields["client_ip"], "198.51.100.7");
        assert!(fields["duration_ms"].is_u64());
    }
}
