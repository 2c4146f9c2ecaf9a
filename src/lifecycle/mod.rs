//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Server::start → background task binds → Idle → Running
//!
//! Termination (controller.rs + signals.rs):
//!     SIGTERM/SIGINT ─┐
//!                     ├─→ await_termination → TerminationReason
//!     fatal bind or ──┘
//!     accept error
//!
//! Shutdown (controller.rs):
//!     stop(deadline) → Running → Stopping → stop accepting
//!                    → drain connections → Stopped
//! ```
//!
//! # Design Decisions
//! - Fail fast: bind and accept failures are fatal, never retried
//! - A fatal error ends the wait exactly like a signal, so shutdown runs the
//!   same way regardless of cause
//! - Shutdown has a deadline: abandon what is left, then exit

pub mod controller;
pub mod signals;
pub mod state;

pub use controller::{Server, TerminationReason};
pub use signals::Signal;
pub use state::LifecycleState;
