//! # Configuration
//!
//! Typed YAML-backed configuration with explicit validation. All settings
//! come from one config file handed to the binary; nothing is read from the
//! environment besides the log filter.

pub mod loader;

pub use loader::load_config;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::time::Duration;

use crate::error::{ReplicationError, Result};

/// Root configuration, mirroring the YAML file shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub replication: ReplicationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Connection settings for the node this sidecar watches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_sslmode")]
    pub sslmode: String,
    /// Accepted for compatibility with libpq-style configs. sqlx always
    /// speaks the binary protocol, so this flag has no effect.
    #[serde(default)]
    pub binary_parameters: bool,
}

/// Settings for the upstream resolver and the caching decorator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicationConfig {
    /// Bound on the standby -> upstream chain walk. Protects byte-lag
    /// resolution against cycles and unexpectedly deep cascades.
    #[serde(default = "default_max_hop")]
    pub max_hop: u32,
    /// TTL of each cache slot. Short enough to bound staleness for a health
    /// check, long enough to collapse a burst of concurrent polls into one
    /// upstream query per window.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_port() -> u16 {
    5432
}

fn default_sslmode() -> String {
    "prefer".to_string()
}

fn default_max_hop() -> u32 {
    4
}

fn default_cache_ttl_ms() -> u64 {
    1000
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            max_hop: default_max_hop(),
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

const SSLMODES: &[&str] = &["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];

impl Config {
    /// Reject configurations that could only fail later and less clearly.
    pub fn validate(&self) -> Result<()> {
        if self.database.host.is_empty() {
            return Err(ReplicationError::Configuration(
                "database.host must not be empty".to_string(),
            ));
        }
        if self.database.database.is_empty() {
            return Err(ReplicationError::Configuration(
                "database.database must not be empty".to_string(),
            ));
        }
        if self.database.user.is_empty() {
            return Err(ReplicationError::Configuration(
                "database.user must not be empty".to_string(),
            ));
        }
        if !SSLMODES.contains(&self.database.sslmode.as_str()) {
            return Err(ReplicationError::Configuration(format!(
                "unknown database.sslmode: {}",
                self.database.sslmode
            )));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.replication.cache_ttl_ms)
    }
}

impl DatabaseConfig {
    /// Connect options for the watched node itself.
    pub fn connect_options(&self) -> PgConnectOptions {
        self.upstream_connect_options(&self.host, self.port)
    }

    /// Connect options for an upstream hop. The WAL receiver's recorded
    /// conninfo supplies host and port, but its credentials are not usable
    /// by this process, so database, user, password, and sslmode are taken
    /// from our own configuration.
    pub fn upstream_connect_options(&self, host: &str, port: u16) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(self.ssl_mode())
    }

    fn ssl_mode(&self) -> PgSslMode {
        match self.sslmode.as_str() {
            "disable" => PgSslMode::Disable,
            "allow" => PgSslMode::Allow,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            _ => PgSslMode::Prefer,
        }
    }
}
