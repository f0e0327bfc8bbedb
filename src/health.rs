//! # Health Evaluator
//!
//! Translates raw replication data into application-level verdicts: "is
//! slot X healthy" for named-standby checks and primary/replica role
//! verdicts for the HTTP endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{ReplicationError, Result};
use crate::models::{NodeInfo, StatReplication};
use crate::replication::ReplicationDataSource;

/// A standby further behind than this is unhealthy.
pub const MAX_HEALTHY_LAG: Duration = Duration::from_secs(1);

pub struct HealthChecker {
    data_source: Arc<dyn ReplicationDataSource>,
}

impl HealthChecker {
    pub fn new(data_source: Arc<dyn ReplicationDataSource>) -> Self {
        Self { data_source }
    }

    /// Snapshot of the node for the role endpoints.
    pub async fn node_info(&self) -> Result<NodeInfo> {
        self.data_source.node_info().await
    }

    async fn stat_replication_by_name(&self, slot_name: &str) -> Result<Option<StatReplication>> {
        let stats = self.data_source.stat_replication().await?;
        // Linear scan, first match wins.
        Ok(stats
            .into_iter()
            .find(|stat| stat.application_name == slot_name))
    }

    /// A healthy replication slot is one whose standby is connected and
    /// flushing within [`MAX_HEALTHY_LAG`] of the upstream.
    ///
    /// A slot that exists but has no connected sender surfaces as not-found;
    /// distinguishing the two would cost an extra query per check and the
    /// verdict would be the same.
    pub async fn check_replication_slot(&self, slot_name: &str) -> Result<()> {
        let Some(stat) = self.stat_replication_by_name(slot_name).await? else {
            return Err(ReplicationError::SlotNotFound {
                slot: slot_name.to_string(),
            });
        };

        let lag = stat.lag_from_upstream();
        if lag > MAX_HEALTHY_LAG {
            return Err(ReplicationError::LagTooHigh {
                slot: slot_name.to_string(),
                lag_ms: lag.as_millis() as i64,
            });
        }

        debug!(slot = slot_name, lag_ms = lag.as_millis() as i64, "slot healthy");
        Ok(())
    }

    /// A node is primary-healthy iff it decoded as primary.
    pub fn primary_healthy(info: &NodeInfo) -> bool {
        info.is_primary()
    }

    /// A node is replica-healthy iff it decoded as replica and its byte lag
    /// fits the caller's budget. No budget means no limit.
    pub fn replica_healthy(info: &NodeInfo, max_allowable_byte_lag: Option<i64>) -> bool {
        info.is_replica()
            && max_allowable_byte_lag.map_or(true, |budget| info.byte_lag <= budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeRole, XlogInfo};
    use chrono::Utc;

    fn node(role: NodeRole, byte_lag: i64) -> NodeInfo {
        NodeInfo {
            state: if role == NodeRole::Replica { 0 } else { 50331648 },
            postmaster_start_time: Utc::now(),
            role,
            xlog: XlogInfo {
                location: 0,
                received_location: 1024,
                replayed_location: Some(1024),
                replayed_timestamp: None,
                paused: false,
            },
            replication: Vec::new(),
            byte_lag,
        }
    }

    #[test]
    fn primary_verdict_ignores_lag() {
        assert!(HealthChecker::primary_healthy(&node(NodeRole::Primary, 0)));
        assert!(!HealthChecker::primary_healthy(&node(NodeRole::Replica, 0)));
    }

    #[test]
    fn replica_verdict_respects_budget() {
        let replica = node(NodeRole::Replica, 150);
        assert!(HealthChecker::replica_healthy(&replica, Some(200)));
        assert!(HealthChecker::replica_healthy(&replica, Some(150)));
        assert!(!HealthChecker::replica_healthy(&replica, Some(100)));
    }

    #[test]
    fn absent_budget_means_no_limit() {
        assert!(HealthChecker::replica_healthy(&node(NodeRole::Replica, i64::MAX), None));
    }

    #[test]
    fn primary_is_never_replica_healthy() {
        assert!(!HealthChecker::replica_healthy(&node(NodeRole::Primary, 0), None));
    }
}
