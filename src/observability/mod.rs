//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (lifecycle, access log, panics)
//!
//! logging.rs builds the subscriber once per process:
//!     prod  → JSON lines, info
//!     other → human-readable, debug
//! ```
//!
//! # Design Decisions
//! - The subscriber is an explicit value built from the environment name
//! - Only the binary installs it globally; library code just emits events
//! - Request ID flows through every access-log event

pub mod logging;
