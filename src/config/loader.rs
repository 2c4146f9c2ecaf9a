//! Configuration loading from the process environment.

use std::fmt;

use crate::config::schema::AppConfig;

pub const APP_ENV: &str = "APP_ENV";
pub const HTTP_ADDR: &str = "HTTP_ADDR";
pub const READ_TIMEOUT_SEC: &str = "READ_TIMEOUT_SEC";
pub const WRITE_TIMEOUT_SEC: &str = "WRITE_TIMEOUT_SEC";
pub const IDLE_TIMEOUT_SEC: &str = "IDLE_TIMEOUT_SEC";
pub const SHUTDOWN_TIMEOUT_SEC: &str = "SHUTDOWN_TIMEOUT_SEC";
pub const TRUST_PROXY_HEADERS: &str = "TRUST_PROXY_HEADERS";

/// A rejected value that was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: &'static str,
    pub value: String,
    pub default: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value for {}: {:?}, using default {}",
            self.key, self.value, self.default
        )
    }
}

/// Result of a load: the config plus every substitution made along the way.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub warnings: Vec<ConfigWarning>,
}

impl LoadedConfig {
    /// Emit one `warn` event per substituted value.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(
                key = warning.key,
                value = %warning.value,
                default = %warning.default,
                "Invalid configuration value, using default"
            );
        }
    }
}

/// Load configuration from `std::env`.
pub fn load_from_env() -> LoadedConfig {
    load_with(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary key lookup.
///
/// Unset and empty keys take their default silently.
pub fn load_with<F>(lookup: F) -> LoadedConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = AppConfig::default();
    let mut reader = EnvReader {
        lookup,
        warnings: Vec::new(),
    };

    let config = AppConfig {
        env: reader.string(APP_ENV, &defaults.env),
        http_addr: reader.addr(HTTP_ADDR, &defaults.http_addr),
        read_timeout_secs: reader.secs(READ_TIMEOUT_SEC, defaults.read_timeout_secs),
        write_timeout_secs: reader.secs(WRITE_TIMEOUT_SEC, defaults.write_timeout_secs),
        idle_timeout_secs: reader.secs(IDLE_TIMEOUT_SEC, defaults.idle_timeout_secs),
        shutdown_timeout_secs: reader.secs(SHUTDOWN_TIMEOUT_SEC, defaults.shutdown_timeout_secs),
        trust_proxy_headers: reader.flag(TRUST_PROXY_HEADERS, defaults.trust_proxy_headers),
    };

    LoadedConfig {
        config,
        warnings: reader.warnings,
    }
}

struct EnvReader<F> {
    lookup: F,
    warnings: Vec<ConfigWarning>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    fn reject(&mut self, key: &'static str, value: String, default: impl ToString) {
        self.warnings.push(ConfigWarning {
            key,
            value,
            default: default.to_string(),
        });
    }

    fn string(&mut self, key: &'static str, default: &str) -> String {
        self.raw(key).unwrap_or_else(|| default.to_string())
    }

    fn secs(&mut self, key: &'static str, default: u64) -> u64 {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match value.trim().parse::<u64>() {
            Ok(secs) => secs,
            Err(_) => {
                self.reject(key, value, default);
                default
            }
        }
    }

    fn flag(&mut self, key: &'static str, default: bool) -> bool {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match value.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => true,
            "0" | "false" | "FALSE" | "no" | "NO" => false,
            _ => {
                self.reject(key, value, default);
                default
            }
        }
    }

    fn addr(&mut self, key: &'static str, default: &str) -> String {
        let Some(value) = self.raw(key) else {
            return default.to_string();
        };
        match normalize_addr(value.trim()) {
            Some(addr) => addr,
            None => {
                self.reject(key, value, default);
                default.to_string()
            }
        }
    }
}

/// Normalize a `host:port` or `:port` binding address.
///
/// A missing host binds every IPv4 interface. IPv6 hosts must be bracketed.
pub fn normalize_addr(raw: &str) -> Option<String> {
    let (host, port) = raw.rsplit_once(':')?;
    port.parse::<u16>().ok()?;

    if host.is_empty() {
        return Some(format!("0.0.0.0:{port}"));
    }
    if host.starts_with('[') {
        return host.ends_with(']').then(|| raw.to_string());
    }
    if host.contains(':') || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(raw.to_string())
}
