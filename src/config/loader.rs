//! Configuration loader.
//!
//! Reads the YAML file, deserializes into [`Config`], and validates before
//! anything touches PostgreSQL.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::Config;
use crate::error::{ReplicationError, Result};

/// Load and validate configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path).map_err(|e| {
        ReplicationError::Configuration(format!("cannot read {}: {e}", path.display()))
    })?;

    let config: Config = serde_yaml::from_str(&raw).map_err(|e| {
        ReplicationError::Configuration(format!("cannot parse {}: {e}", path.display()))
    })?;

    config.validate()?;

    debug!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.database,
        max_hop = config.replication.max_hop,
        cache_ttl_ms = config.replication.cache_ttl_ms,
        "configuration loaded"
    );

    Ok(config)
}
