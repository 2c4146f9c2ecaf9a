//! Liveness short-circuit.
//!
//! `GET`/`HEAD` on [`LIVENESS_PATH`] answer `200 .` before any later stage
//! runs, so probes never reach the access log or the handlers.

use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const LIVENESS_PATH: &str = "/live";

fn is_probe(req: &Request) -> bool {
    (req.method() == Method::GET || req.method() == Method::HEAD)
        && req.uri().path().eq_ignore_ascii_case(LIVENESS_PATH)
}

pub async fn heartbeat(req: Request, next: Next) -> Response {
    if is_probe(&req) {
        return (StatusCode::OK, [(CONTENT_TYPE, "text/plain")], ".").into_response();
    }
    next.run(req).await
}
