//! Request pipeline stages.
//!
//! Applied to every inbound request, outermost first:
//!
//! ```text
//! request ID → client IP → panic boundary → liveness → access log → handler
//! ```

pub mod access_log;
pub mod client_ip;
pub mod heartbeat;
pub mod recover;

pub use access_log::access_log;
pub use client_ip::{resolve_client_ip, ClientIp, ProxyTrust};
pub use heartbeat::{heartbeat, LIVENESS_PATH};
pub use recover::recover_layer;
