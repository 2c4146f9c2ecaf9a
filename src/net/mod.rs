//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, transient vs fatal errors)
//!     → connection.rs (idle timeout, open-connection tracking)
//!     → hyper connection (HTTP/1.1 or HTTP/2)
//!     → Hand off to the request pipeline
//! ```
//!
//! # Design Decisions
//! - Each connection is tracked for graceful shutdown
//! - Dropping the listener is what makes new connections fail during a drain

pub mod connection;
pub mod listener;
