//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional, loaded by main)
//!     → process environment
//!     → loader.rs (parse each key, fall back to defaults)
//!     → AppConfig (immutable)
//!     → passed by reference to the router and the lifecycle controller
//! ```
//!
//! # Design Decisions
//! - Loading never fails: bad values are reported and replaced by defaults
//! - Warnings are collected rather than logged, since the log subscriber
//!   depends on the loaded environment name
//! - Lookup is injectable so parsing is testable without touching `std::env`

pub mod loader;
pub mod schema;

pub use loader::{load_from_env, load_with, ConfigWarning, LoadedConfig};
pub use schema::AppConfig;
