//! Real client address resolution.
//!
//! # Responsibilities
//! - Resolve the originating client address of each request
//! - Honour proxy headers only when configured to trust them
//! - Expose the result as a [`ClientIp`] request extension
//!
//! # Design Decisions
//! - Header precedence: `True-Client-IP`, `X-Real-IP`, then the first
//!   `X-Forwarded-For` entry
//! - Unparseable header values fall through to the TCP peer address

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

const TRUE_CLIENT_IP: &str = "true-client-ip";
const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolved client address of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Whether proxy-supplied headers are believed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyTrust(pub bool);

/// Resolve the client address from headers and the peer socket.
pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trust: ProxyTrust) -> Option<IpAddr> {
    if trust.0 {
        let from_headers = header_ip(headers, TRUE_CLIENT_IP)
            .or_else(|| header_ip(headers, X_REAL_IP))
            .or_else(|| forwarded_for(headers));
        if from_headers.is_some() {
            return from_headers;
        }
    }
    peer.map(|addr| addr.ip())
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Middleware attaching [`ClientIp`] to the request.
pub async fn resolve_client_ip(
    State(trust): State<ProxyTrust>,
    mut req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if let Some(ip) = resolve(req.headers(), peer, trust) {
        req.extensions_mut().insert(ClientIp(ip));
    }

    next.run(req).await
}
