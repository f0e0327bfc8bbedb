//! Row model for `pg_stat_replication`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::time::Duration;

/// One row per currently-connected standby sender, from
/// `pg_stat_replication`.
///
/// Interval columns are surfaced as whole milliseconds (`NULL` when the
/// standby has not reported the stage yet); LSN columns as text tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatReplication {
    pub pid: i32,
    pub username: Option<String>,
    pub application_name: String,
    pub client_addr: Option<String>,
    pub client_hostname: Option<String>,
    pub client_port: Option<i32>,
    pub state: Option<String>,
    pub sent_lsn: Option<String>,
    pub write_lsn: Option<String>,
    pub flush_lsn: Option<String>,
    pub replay_lsn: Option<String>,
    pub write_lag_ms: Option<i64>,
    pub flush_lag_ms: Option<i64>,
    pub replay_lag_ms: Option<i64>,
    pub sync_priority: Option<i32>,
    pub sync_state: Option<String>,
}

impl StatReplication {
    /// How far this standby is behind its upstream.
    ///
    /// Deliberately the flush lag, not the replay lag: the health contract
    /// cares about durability on the standby, not apply progress. Missing or
    /// negative lag reports as zero.
    pub fn lag_from_upstream(&self) -> Duration {
        Duration::from_millis(self.flush_lag_ms.unwrap_or(0).max(0) as u64)
    }
}
