//! # Structured Error Handling
//!
//! Crate-wide error taxonomy for the replication data access and health
//! checking layers. Domain conditions ("slot not found", "lag too high") are
//! distinct variants so the HTTP layer can map them to specific status codes
//! instead of a blanket 500.

use thiserror::Error;

/// Errors surfaced by the replication facade, upstream resolver, caching
/// decorator, and health checker.
///
/// Connectivity and query failures are never fatal to the process: a
/// monitoring sidecar has to outlive individual PostgreSQL hiccups, so every
/// path returns one of these instead of aborting.
#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("replication slot not found: {slot}")]
    SlotNotFound { slot: String },

    #[error("replication lag is too high for slot {slot}: {lag_ms}ms")]
    LagTooHigh { slot: String, lag_ms: i64 },

    #[error("reached max hop limit ({max_hop}) while resolving upstream primary")]
    MaxHopExceeded { max_hop: u32 },

    #[error("standby has no pg_stat_wal_receiver row; cannot resolve upstream")]
    NoWalReceiver,

    #[error("node info query returned no rows")]
    EmptyNodeInfo,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to decode replication summary: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ReplicationError>;
