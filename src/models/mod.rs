//! # Replication Data Models
//!
//! Typed rows and aggregates for the PostgreSQL system views the sidecar
//! polls. PostgreSQL remains the source of truth; these are point-in-time
//! snapshots, re-fetched in full on every cache miss.

pub mod node_info;
pub mod replication_slot;
pub mod stat_replication;

pub use node_info::{NodeInfo, NodeRole, ReplicationInfo, XlogInfo};
pub use replication_slot::ReplicationSlot;
pub use stat_replication::StatReplication;
