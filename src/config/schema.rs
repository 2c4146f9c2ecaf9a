//! Configuration schema definitions.

use std::time::Duration;

use serde::Serialize;

/// Environment name that selects the production logging profile.
pub const PRODUCTION_ENV: &str = "prod";

/// Startup parameters for the service.
///
/// Timeouts are whole seconds; zero disables the corresponding timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    /// Environment name (`dev`, `prod`, `test`, ...).
    pub env: String,

    /// Bind address, normalized to `host:port`.
    pub http_addr: String,

    /// Max time to read request headers and body.
    pub read_timeout_secs: u64,

    /// Max time for a handler to produce its response.
    pub write_timeout_secs: u64,

    /// Max keep-alive inactivity on a connection.
    pub idle_timeout_secs: u64,

    /// Drain deadline applied after a termination signal.
    pub shutdown_timeout_secs: u64,

    /// Whether client-IP resolution honours proxy headers.
    pub trust_proxy_headers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            http_addr: "0.0.0.0:8080".to_string(),
            read_timeout_secs: 10,
            write_timeout_secs: 10,
            idle_timeout_secs: 60,
            shutdown_timeout_secs: 10,
            trust_proxy_headers: true,
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env == PRODUCTION_ENV
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.write_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.idle_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
