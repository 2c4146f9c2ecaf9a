//! Error taxonomy for the service.
//!
//! Only [`StartupError`] and signal receipt reach the top-level lifecycle
//! orchestration. Configuration problems are downgraded to warnings by the
//! loader and request panics are absorbed by the pipeline.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Fatal listener failures. Never retried.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The configured address could not be bound (in use, permission denied, bad host).
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The accept loop hit a non-transient error.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
}

/// Outcome of a graceful shutdown that did not drain cleanly.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The drain deadline elapsed; remaining connections were abandoned.
    #[error("graceful shutdown timed out after {deadline:?} with {open_connections} connection(s) still open")]
    TimedOut {
        deadline: Duration,
        open_connections: usize,
    },

    /// The accept task panicked or was cancelled before the drain finished.
    #[error("accept loop terminated abnormally: {0}")]
    Aborted(String),
}

/// Misuse of the lifecycle controller.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("server already started (state: {state})")]
    AlreadyStarted { state: LifecycleState },
}
