//! # pgsentinel
//!
//! HTTP sidecar answering "is this PostgreSQL node healthy as a primary /
//! as a replica?". Load balancers poll its endpoints instead of querying
//! PostgreSQL directly; the sidecar polls the replication catalog views,
//! derives a role and a byte-lag figure, and caches the results for one TTL
//! window to collapse poll bursts into single queries.
//!
//! ## Architecture
//!
//! HTTP handler -> [`health::HealthChecker`] ->
//! [`replication::CachedDataSource`] ->
//! [`replication::PgReplicationDataSource`] -> PostgreSQL, plus extra
//! connections up the standby chain when resolving byte lag against the
//! topology's root primary.
//!
//! ## Module Organization
//!
//! - [`models`] - typed rows and the `NodeInfo` aggregate
//! - [`replication`] - data source trait, sqlx facade, upstream resolver,
//!   TTL cache
//! - [`health`] - slot and role verdicts
//! - [`web`] - axum router and handlers
//! - [`config`] - YAML configuration
//! - [`recovery`] - recovery.conf fetch and parse
//! - [`error`] - structured error handling
//! - [`logging`] - tracing initialization
//!
//! The system observes and reports replication state only: it never
//! promotes, demotes, or reconfigures a node, and it keeps no state across
//! restarts.

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod models;
pub mod recovery;
pub mod replication;
pub mod web;

pub use config::{Config, DatabaseConfig, ReplicationConfig, ServerConfig};
pub use error::{ReplicationError, Result};
pub use health::HealthChecker;
pub use models::{NodeInfo, NodeRole, ReplicationInfo, ReplicationSlot, StatReplication, XlogInfo};
pub use replication::{CachedDataSource, PgReplicationDataSource, ReplicationDataSource};
