//! Aggregated node snapshot returned to API consumers.
//!
//! A `NodeInfo` is built fresh on every uncached poll, is immutable once
//! built, and is superseded wholesale by the next poll.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded replication role of a node.
///
/// Derived from the raw recovery-state code of the node-info query: a node
/// still in recovery reports `0` and is a replica, anything else is a
/// primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Primary,
    Replica,
}

impl NodeRole {
    /// Decode the role from the raw recovery-state code.
    pub fn from_state_code(state: i64) -> Self {
        if state == 0 {
            NodeRole::Replica
        } else {
            NodeRole::Primary
        }
    }
}

/// Local write-ahead-log positions, in bytes from `0/0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XlogInfo {
    /// Current WAL write position; zero while the node is in recovery.
    pub location: i64,
    /// Last position received from the upstream sender. Defaulted to the
    /// replayed position when the receiver reports zero (a standby that has
    /// replayed everything received reports identical positions).
    pub received_location: i64,
    /// Last position replayed during recovery; `None` on a primary.
    pub replayed_location: Option<i64>,
    /// Timestamp of the last replayed transaction.
    pub replayed_timestamp: Option<DateTime<Utc>>,
    /// Whether WAL replay is currently paused.
    pub paused: bool,
}

impl XlogInfo {
    /// Default a zero received location to the replayed location. A standby
    /// that has replayed everything received reports identical positions.
    pub fn with_received_location_defaulted(mut self) -> Self {
        if self.received_location == 0 {
            self.received_location = self.replayed_location.unwrap_or(0);
        }
        self
    }
}

/// Per-connected-standby summary, projected from the wal sender view for
/// reporting only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationInfo {
    pub username: Option<String>,
    pub application_name: Option<String>,
    pub client_addr: Option<String>,
    pub state: Option<String>,
    pub sync_state: Option<String>,
    pub sync_priority: Option<i64>,
}

/// The aggregate snapshot served as the JSON body of every health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Raw recovery-state code (0 when in recovery).
    pub state: i64,
    pub postmaster_start_time: DateTime<Utc>,
    pub role: NodeRole,
    pub xlog: XlogInfo,
    pub replication: Vec<ReplicationInfo>,
    /// Bytes this node is behind its replication chain's root primary, not
    /// just its immediate sender. Zero when unresolvable (e.g. a freshly
    /// promoted node with no replayed position yet).
    pub byte_lag: i64,
}

impl NodeInfo {
    pub fn is_primary(&self) -> bool {
        self.role == NodeRole::Primary
    }

    pub fn is_replica(&self) -> bool {
        self.role == NodeRole::Replica
    }
}
