//! Structured logging.
//!
//! # Responsibilities
//! - Map the environment name to a logging profile
//! - Build the `tracing` subscriber for that profile
//! - Install it as the process-wide default (binary only)
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the profile's default level

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::schema::PRODUCTION_ENV;

/// Output format and verbosity selected by the environment name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogProfile {
    /// JSON lines at `info`.
    Production,
    /// Human-readable output at `debug`.
    Development,
}

impl LogProfile {
    pub fn for_env(env: &str) -> Self {
        if env == PRODUCTION_ENV {
            LogProfile::Production
        } else {
            LogProfile::Development
        }
    }

    fn default_directives(self) -> &'static str {
        match self {
            LogProfile::Production => "info",
            LogProfile::Development => "debug,hyper=info,hyper_util=info,h2=info",
        }
    }
}

/// Build the subscriber for `env` without installing it.
pub fn build_subscriber(env: &str) -> Box<dyn Subscriber + Send + Sync> {
    let profile = LogProfile::for_env(env);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(profile.default_directives()));
    let registry = tracing_subscriber::registry().with(filter);

    match profile {
        LogProfile::Production => Box::new(registry.with(fmt::layer().json())),
        LogProfile::Development => Box::new(registry.with(fmt::layer())),
    }
}

/// Install the subscriber for `env` as the global default.
///
/// Fails if a global subscriber was already set.
pub fn init(env: &str) -> Result<(), SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(build_subscriber(env))
}
