//! # Recovery Configuration
//!
//! Fetches and parses PostgreSQL's `recovery.conf` (the pre-v12 standby
//! configuration file) through `pg_read_file`. Standalone: nothing in the
//! caching or health core depends on it.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("missing recovery.conf")]
    MissingRecoveryConf,

    #[error("primary_conninfo missing in recovery.conf")]
    PrimaryConninfoMissing,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Parsed `recovery.conf` settings.
///
/// The file uses the GUC `key = 'value'` format: one setting per line,
/// values optionally single-quoted with `''` escaping, `#` comments.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConf {
    settings: HashMap<String, String>,
}

impl RecoveryConf {
    pub fn parse(contents: &str) -> Self {
        let mut settings = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            let value = if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
                value[1..value.len() - 1].replace("''", "'")
            } else {
                value.to_string()
            };
            settings.insert(key.trim().to_string(), value);
        }
        Self { settings }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// The conninfo this standby uses to reach its primary.
    pub fn primary_conninfo(&self) -> Result<&str, RecoveryError> {
        match self.get("primary_conninfo") {
            Some(conninfo) if !conninfo.is_empty() => Ok(conninfo),
            _ => Err(RecoveryError::PrimaryConninfoMissing),
        }
    }
}

/// Read `recovery.conf` from the server's data directory via
/// `pg_read_file`. An absent or empty file reports
/// [`RecoveryError::MissingRecoveryConf`].
pub async fn fetch_recovery_conf(pool: &PgPool) -> Result<RecoveryConf, RecoveryError> {
    let contents: Option<String> = sqlx::query_scalar("SELECT pg_read_file('recovery.conf')")
        .fetch_optional(pool)
        .await?;

    match contents {
        Some(contents) if !contents.is_empty() => Ok(RecoveryConf::parse(&contents)),
        _ => Err(RecoveryError::MissingRecoveryConf),
    }
}
