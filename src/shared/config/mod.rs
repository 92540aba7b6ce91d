//! Application configuration module
//!
//! Configuration is layered, lowest precedence first:
//!
//! 1. Built-in defaults (tuned for a local run)
//! 2. An optional TOML file named by `CHATRELAY_CONFIG`
//! 3. Process environment (`HTTP_PORT`, `HOSTNAME`, `ADVERTISE_ADDR`,
//!    `DATABASE_URL`/`POSTGRES_DSN`, `REDIS_ADDR`)
//!
//! # Example
//!
//! ```toml
//! http_port = 7999
//! redis_addr = "redis://localhost:6381"
//!
//! [session]
//! ping_period_ms = 60000
//! read_wait_ms = 120000
//!
//! [directory]
//! ttl_ms = 300000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "CHATRELAY_CONFIG";

/// Smallest identity lease TTL accepted.
pub const MIN_IDENTITY_TTL_MS: u64 = 3_000;

/// Per-connection timing and queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Interval between keepalive pings written by the server
    pub ping_period_ms: u64,
    /// How long a silent peer is tolerated before the read loop gives up
    pub read_wait_ms: u64,
    /// Upper bound on a single socket write
    pub write_wait_ms: u64,
    /// Capacity of each user's local delivery queue
    pub local_channel_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ping_period_ms: 60_000,
            read_wait_ms: 120_000,
            write_wait_ms: 60_000,
            local_channel_capacity: 10,
        }
    }
}

/// Session directory settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// Expiry of a directory entry; bounds the stale window after a crash
    pub ttl_ms: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self { ttl_ms: 300_000 }
    }
}

/// Backend identity lease settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub ttl_ms: u64,
    /// Candidate tokens tried before start-up is abandoned
    pub max_attempts: u32,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            ttl_ms: 600_000,
            max_attempts: 32,
        }
    }
}

/// Message routing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Bound on a single delivery attempt (local enqueue or remote forward)
    pub delivery_timeout_ms: u64,
    /// Bound on enqueueing a redirected message on the receiving backend
    pub redirect_timeout_ms: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            delivery_timeout_ms: 5_000,
            redirect_timeout_ms: 5_000,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Port the HTTP/WebSocket listener binds on all interfaces
    pub http_port: u16,
    /// Host name of this machine, used to build the advertised address
    pub host_name: String,
    /// `host:port` other backends use to reach this one; defaults to
    /// `{host_name}:{http_port}`
    pub advertise_addr: Option<String>,
    /// Postgres DSN; the in-memory repository is used when absent
    pub database_url: Option<String>,
    /// Redis URL or `host:port`; the in-memory store is used when absent
    pub redis_addr: Option<String>,
    pub session: SessionSettings,
    pub directory: DirectorySettings,
    pub identity: IdentitySettings,
    pub routing: RoutingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 7999,
            host_name: "localhost".to_string(),
            advertise_addr: None,
            database_url: None,
            redis_addr: None,
            session: SessionSettings::default(),
            directory: DirectorySettings::default(),
            identity: IdentitySettings::default(),
            routing: RoutingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from the optional TOML file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("HTTP_PORT") {
            self.http_port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HTTP_PORT",
                message: format!("`{}` is not a port number", port),
            })?;
        }
        if let Some(host) = lookup("HOSTNAME").filter(|h| !h.is_empty()) {
            self.host_name = host;
        }
        if let Some(addr) = lookup("ADVERTISE_ADDR").filter(|a| !a.is_empty()) {
            self.advertise_addr = Some(addr);
        }
        if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("POSTGRES_DSN")) {
            self.database_url = Some(url);
        }
        if let Some(addr) = lookup("REDIS_ADDR") {
            self.redis_addr = Some(addr);
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.local_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.local_channel_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        if self.session.ping_period_ms == 0 || self.session.write_wait_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session",
                message: "ping period and write wait must be non-zero".to_string(),
            });
        }
        if self.session.ping_period_ms >= self.session.read_wait_ms {
            return Err(ConfigError::InvalidValue {
                key: "session.ping_period_ms",
                message: format!(
                    "ping period ({}ms) must be shorter than read wait ({}ms)",
                    self.session.ping_period_ms, self.session.read_wait_ms
                ),
            });
        }
        // Entries are only refreshed on keepalive ticks; one missed refresh
        // must not expire a connected user.
        if self.directory.ttl_ms < self.session.ping_period_ms.saturating_mul(2) {
            return Err(ConfigError::InvalidValue {
                key: "directory.ttl_ms",
                message: format!(
                    "directory TTL ({}ms) must be at least twice the ping period ({}ms)",
                    self.directory.ttl_ms, self.session.ping_period_ms
                ),
            });
        }
        // Renewal runs at 2/3 of the TTL, leaving a third for the round trip.
        if self.identity.ttl_ms < MIN_IDENTITY_TTL_MS {
            return Err(ConfigError::InvalidValue {
                key: "identity.ttl_ms",
                message: format!(
                    "identity TTL ({}ms) must be at least {}ms",
                    self.identity.ttl_ms, MIN_IDENTITY_TTL_MS
                ),
            });
        }
        if self.identity.max_attempts == 0 {
            return Err(ConfigError::MissingValue("identity.max_attempts"));
        }
        Ok(())
    }

    /// Address other backends use for redirects.
    pub fn advertised_addr(&self) -> String {
        self.advertise_addr
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.host_name, self.http_port))
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.session.ping_period_ms)
    }

    pub fn read_wait(&self) -> Duration {
        Duration::from_millis(self.session.read_wait_ms)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.session.write_wait_ms)
    }

    pub fn directory_ttl(&self) -> Duration {
        Duration::from_millis(self.directory.ttl_ms)
    }

    pub fn identity_ttl(&self) -> Duration {
        Duration::from_millis(self.identity.ttl_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.routing.delivery_timeout_ms)
    }

    pub fn redirect_timeout(&self) -> Duration {
        Duration::from_millis(self.routing.redirect_timeout_ms)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    pub fn advertise_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.advertise_addr = Some(addr.into());
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn redis_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.redis_addr = Some(addr.into());
        self
    }

    pub fn ping_period(mut self, period: Duration) -> Self {
        self.config.session.ping_period_ms = period.as_millis() as u64;
        self
    }

    pub fn read_wait(mut self, wait: Duration) -> Self {
        self.config.session.read_wait_ms = wait.as_millis() as u64;
        self
    }

    pub fn write_wait(mut self, wait: Duration) -> Self {
        self.config.session.write_wait_ms = wait.as_millis() as u64;
        self
    }

    pub fn local_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.session.local_channel_capacity = capacity;
        self
    }

    pub fn directory_ttl(mut self, ttl: Duration) -> Self {
        self.config.directory.ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn identity_ttl(mut self, ttl: Duration) -> Self {
        self.config.identity.ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn identity_max_attempts(mut self, attempts: u32) -> Self {
        self.config.identity.max_attempts = attempts;
        self
    }

    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.config.routing.delivery_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn redirect_timeout(mut self, timeout: Duration) -> Self {
        self.config.routing.redirect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
