//! Shared in-memory `ReplicationDataSource` fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use pgsentinel::error::{ReplicationError, Result};
use pgsentinel::models::{
    NodeInfo, NodeRole, ReplicationSlot, StatReplication, XlogInfo,
};
use pgsentinel::replication::ReplicationDataSource;

/// Mutable in-memory data source. Tests flip the underlying values between
/// calls to observe caching behavior, or flip `fail` to simulate an outage.
#[derive(Default)]
pub struct MockDataSource {
    pub node_info: Mutex<Option<NodeInfo>>,
    pub in_recovery: Mutex<bool>,
    pub stats: Mutex<Vec<StatReplication>>,
    pub slots: Mutex<Vec<ReplicationSlot>>,
    pub fail: AtomicBool,
    pub closed: AtomicBool,
    pub node_info_calls: AtomicUsize,
    pub in_recovery_calls: AtomicUsize,
    pub stat_replication_calls: AtomicUsize,
}

impl MockDataSource {
    pub fn with_node_info(info: NodeInfo) -> Self {
        let mock = Self::default();
        *mock.node_info.lock().unwrap() = Some(info);
        mock
    }

    pub fn with_stats(stats: Vec<StatReplication>) -> Self {
        let mock = Self::default();
        *mock.stats.lock().unwrap() = stats;
        mock
    }

    pub fn set_node_info(&self, info: NodeInfo) {
        *self.node_info.lock().unwrap() = Some(info);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_fail(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(ReplicationError::Configuration(
                "simulated outage".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReplicationDataSource for MockDataSource {
    async fn node_info(&self) -> Result<NodeInfo> {
        self.node_info_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail()?;
        self.node_info
            .lock()
            .unwrap()
            .clone()
            .ok_or(ReplicationError::EmptyNodeInfo)
    }

    async fn is_in_recovery(&self) -> Result<bool> {
        self.in_recovery_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail()?;
        Ok(*self.in_recovery.lock().unwrap())
    }

    async fn stat_replication(&self) -> Result<Vec<StatReplication>> {
        self.stat_replication_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail()?;
        Ok(self.stats.lock().unwrap().clone())
    }

    async fn replication_slots(&self) -> Result<Vec<ReplicationSlot>> {
        self.check_fail()?;
        Ok(self.slots.lock().unwrap().clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A node snapshot with the given role and byte lag.
pub fn node(role: NodeRole, byte_lag: i64) -> NodeInfo {
    NodeInfo {
        state: match role {
            NodeRole::Replica => 0,
            NodeRole::Primary => 50331648,
        },
        postmaster_start_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        role,
        xlog: XlogInfo {
            location: 0,
            received_location: 83886080,
            replayed_location: Some(83886080),
            replayed_timestamp: None,
            paused: false,
        },
        replication: Vec::new(),
        byte_lag,
    }
}

/// A wal sender row for `application_name` with the given flush lag.
pub fn sender(application_name: &str, flush_lag_ms: i64) -> StatReplication {
    StatReplication {
        pid: 4242,
        username: Some("replicator".to_string()),
        application_name: application_name.to_string(),
        client_addr: Some("10.0.0.2".to_string()),
        client_hostname: None,
        client_port: Some(51234),
        state: Some("streaming".to_string()),
        sent_lsn: Some("0/5000120".to_string()),
        write_lsn: Some("0/5000120".to_string()),
        flush_lsn: Some("0/5000120".to_string()),
        replay_lsn: Some("0/50000F8".to_string()),
        write_lag_ms: Some(1),
        flush_lag_ms: Some(flush_lag_ms),
        replay_lag_ms: Some(flush_lag_ms + 5),
        sync_priority: Some(0),
        sync_state: Some("async".to_string()),
    }
}
