//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! hyper connection
//!     → request.rs (assign / propagate request ID)
//!     → middleware/ (client IP, panic boundary, liveness, access log)
//!     → router.rs (timeouts, route match)
//!     → handlers.rs
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod router;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use router::{build_router, with_pipeline};
