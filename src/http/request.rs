//! Request correlation identifiers.
//!
//! # Responsibilities
//! - Assign a UUID v4 request ID when the client did not send one
//! - Keep an incoming `x-request-id` untouched
//! - Echo the ID on the response
//!
//! # Design Decisions
//! - Request ID added as the outermost stage so every later stage sees it
//! - The ID travels in request extensions as `tower_http::request_id::RequestId`

use axum::http::{HeaderName, Request};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// Header carrying the correlation identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Placeholder logged when a request somehow reached a stage without an ID.
const MISSING_REQUEST_ID: &str = "-";

/// Layer assigning or keeping the request ID.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Access to the correlation identifier of a request.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
            .or_else(|| {
                self.headers()
                    .get(&X_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
            })
            .unwrap_or(MISSING_REQUEST_ID)
    }
}
