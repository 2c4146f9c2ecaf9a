//! Minimal HTTP service skeleton.
//!
//! # Architecture Overview
//!
//! ```text
//!   env / .env ──▶ config ──┬──────────────▶ observability (log subscriber)
//!                           │
//!                           ├──▶ http::router (pipeline + routes)
//!                           │          │
//!                           ▼          ▼
//!                     lifecycle::Server ──▶ net::listener (accept loop)
//!                           │                       │
//!      SIGINT / SIGTERM ───▶│◀── fatal bind/accept ─┘
//!                           ▼
//!                   stop(deadline) → drain → exit
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use error::{LifecycleError, ShutdownError, StartupError};
pub use lifecycle::{LifecycleState, Server, Signal, TerminationReason};
