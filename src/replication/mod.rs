//! # Replication Data Access
//!
//! The facade over PostgreSQL's replication catalog views, the hop-bounded
//! upstream WAL resolver, and the TTL caching decorator that shields
//! PostgreSQL from a thundering herd of health-check polls.
//!
//! Everything downstream (health checker, HTTP handlers, tests) talks to the
//! [`ReplicationDataSource`] trait; [`PgReplicationDataSource`] is the one
//! production implementation and the integration tests provide in-memory
//! ones.

pub mod cache;
pub mod data_source;
pub mod upstream;

pub use cache::CachedDataSource;
pub use data_source::PgReplicationDataSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NodeInfo, ReplicationSlot, StatReplication};

/// Capability set for querying a node's replication state.
///
/// Every call except [`close`](Self::close) issues at least one network
/// round trip; [`node_info`](Self::node_info) issues several (the local
/// aggregate query plus the upstream-chain walk for byte lag). Caching is
/// the decorator's job, not the implementor's.
#[async_trait]
pub trait ReplicationDataSource: Send + Sync {
    /// Aggregated snapshot of the node: role, WAL positions, connected
    /// senders, and byte lag behind the topology's root primary.
    async fn node_info(&self) -> Result<NodeInfo>;

    /// Direct passthrough of `pg_is_in_recovery()`.
    async fn is_in_recovery(&self) -> Result<bool>;

    /// Full unfiltered row set of `pg_stat_replication`; callers filter by
    /// identity client-side.
    async fn stat_replication(&self) -> Result<Vec<StatReplication>>;

    /// Full unfiltered row set of `pg_replication_slots`.
    async fn replication_slots(&self) -> Result<Vec<ReplicationSlot>>;

    /// Release the underlying connection. Idempotent.
    async fn close(&self);
}
