//! Route wiring and pipeline composition.
//!
//! # Responsibilities
//! - Declare the application routes
//! - Wrap any set of routes in the request pipeline
//!
//! # Design Decisions
//! - `Router::layer` wraps inside-out, so stages are added innermost first
//! - Timeouts sit directly around the handlers; the panic boundary sits
//!   outside liveness and access logging, like the stage list reads
//! - The fallback is layered too, which is what lets the liveness stage
//!   answer a path that has no route

use axum::{http::StatusCode, middleware, routing::get, Router};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

use crate::config::AppConfig;
use crate::http::handlers::{self, HealthState};
use crate::http::middleware::{self as stages, ProxyTrust};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// Full application: API routes behind the request pipeline.
pub fn build_router(config: &AppConfig) -> Router {
    with_pipeline(api_routes(config), config)
}

/// Application routes without any middleware.
pub fn api_routes(config: &AppConfig) -> Router {
    let state = HealthState {
        env: config.env.as_str().into(),
    };

    let api = Router::new()
        .route("/health", get(handlers::health))
        .with_state(state);

    Router::new().nest("/api", api)
}

/// Apply the request pipeline to `routes`.
///
/// Unknown paths fall back to a JSON `404`. A handler overrunning the write
/// timeout is answered with `503`.
pub fn with_pipeline(routes: Router, config: &AppConfig) -> Router {
    let mut app = routes.fallback(handlers::not_found);

    if let Some(write_timeout) = config.write_timeout() {
        app = app.layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            write_timeout,
        ));
    }
    if let Some(read_timeout) = config.read_timeout() {
        app = app.layer(RequestBodyTimeoutLayer::new(read_timeout));
    }

    app.layer(middleware::from_fn(stages::access_log))
        .layer(middleware::from_fn(stages::heartbeat))
        .layer(stages::recover_layer())
        .layer(middleware::from_fn_with_state(
            ProxyTrust(config.trust_proxy_headers),
            stages::resolve_client_ip,
        ))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}
