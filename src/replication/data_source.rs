//! sqlx implementation of the replication facade.
//!
//! One lazily-built connection pool against the watched node, recycled every
//! few seconds so a long-lived sidecar never clings to a dead backend. No
//! caching here; that is [`CachedDataSource`](super::CachedDataSource)'s
//! job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::upstream::{resolve_root_wal_lsn, PgUpstreamNode};
use super::ReplicationDataSource;
use crate::config::Config;
use crate::error::{ReplicationError, Result};
use crate::models::{NodeInfo, NodeRole, ReplicationInfo, ReplicationSlot, StatReplication, XlogInfo};

/// Aggregate node-state query, originally lifted from patroni. One round
/// trip yields postmaster start time, the raw recovery-state code, local WAL
/// byte positions, the replay-pause flag, and a JSON array of per-sender
/// rows.
const NODE_INFO_SQL: &str = r"
SELECT pg_catalog.pg_postmaster_start_time() AS postmaster_start_time,
       CASE
           WHEN pg_catalog.pg_is_in_recovery() THEN 0
           ELSE ('x' || pg_catalog.substr(pg_catalog.pg_walfile_name(pg_catalog.pg_current_wal_lsn()), 1, 8))::bit(32)::int
       END::bigint AS state,
       CASE
           WHEN pg_catalog.pg_is_in_recovery() THEN 0
           ELSE pg_catalog.pg_wal_lsn_diff(pg_catalog.pg_current_wal_lsn(), '0/0')::bigint
       END AS location,
       pg_catalog.pg_wal_lsn_diff(pg_catalog.pg_last_wal_replay_lsn(), '0/0')::bigint AS replayed_location,
       pg_catalog.pg_wal_lsn_diff(COALESCE(pg_catalog.pg_last_wal_receive_lsn(), '0/0'), '0/0')::bigint AS received_location,
       pg_catalog.pg_is_in_recovery() AND pg_catalog.pg_is_wal_replay_paused() AS paused,
       pg_catalog.pg_last_xact_replay_timestamp() AS replayed_timestamp,
       pg_catalog.array_to_json(pg_catalog.array_agg(pg_catalog.row_to_json(ri))) AS replication
FROM
  (SELECT
     (SELECT rolname
      FROM pg_authid
      WHERE oid = usesysid) AS username,
          application_name,
          client_addr,
          w.state,
          sync_state,
          sync_priority
   FROM pg_catalog.pg_stat_get_wal_senders() w,
        pg_catalog.pg_stat_get_activity(pid)) AS ri
";

const STAT_REPLICATION_SQL: &str = r"
SELECT pid,
       usename::text AS username,
       application_name,
       client_addr::text AS client_addr,
       client_hostname,
       client_port,
       state,
       sent_lsn::text AS sent_lsn,
       write_lsn::text AS write_lsn,
       flush_lsn::text AS flush_lsn,
       replay_lsn::text AS replay_lsn,
       (extract(epoch FROM write_lag) * 1000)::bigint AS write_lag_ms,
       (extract(epoch FROM flush_lag) * 1000)::bigint AS flush_lag_ms,
       (extract(epoch FROM replay_lag) * 1000)::bigint AS replay_lag_ms,
       sync_priority,
       sync_state
FROM pg_stat_replication
";

const REPLICATION_SLOTS_SQL: &str = r"
SELECT slot_name::text AS slot_name,
       plugin::text AS plugin,
       slot_type,
       database::text AS database,
       temporary,
       active,
       active_pid,
       xmin::text AS xmin,
       catalog_xmin::text AS catalog_xmin,
       restart_lsn::text AS restart_lsn,
       confirmed_flush_lsn::text AS confirmed_flush_lsn
FROM pg_replication_slots
";

/// Production facade over one PostgreSQL connection.
pub struct PgReplicationDataSource {
    config: Config,
    /// Lazily built and reused across calls; its own lock, distinct from
    /// the cache lock, so a pool rebuild cannot race with itself.
    pool: Mutex<Option<PgPool>>,
}

impl PgReplicationDataSource {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pool: Mutex::new(None),
        }
    }

    async fn pool(&self) -> Result<PgPool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .max_lifetime(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(5))
            .connect_with(self.config.database.connect_options())
            .await
            .map_err(|e| {
                error!(host = %self.config.database.host, error = %e, "cannot build connection pool");
                ReplicationError::from(e)
            })?;

        *guard = Some(pool.clone());
        Ok(pool)
    }

    /// Bytes between the topology's root primary and this node's last
    /// replayed position. `None` when the node has no replayed position
    /// (a primary, or a freshly promoted node), in which case byte lag is
    /// reported as zero.
    async fn resolve_byte_lag(&self, pool: &PgPool) -> Result<Option<i64>> {
        let last_replay: Option<String> =
            sqlx::query_scalar("SELECT pg_last_wal_replay_lsn()::text")
                .fetch_one(pool)
                .await?;
        let Some(last_replay) = last_replay else {
            return Ok(None);
        };

        let start = PgUpstreamNode::new(pool.clone(), self.config.database.clone());
        let root_lsn =
            resolve_root_wal_lsn(&start, self.config.replication.max_hop).await?;

        let byte_lag: i64 =
            sqlx::query_scalar("SELECT pg_wal_lsn_diff($1::pg_lsn, $2::pg_lsn)::bigint")
                .bind(&root_lsn)
                .bind(&last_replay)
                .fetch_one(pool)
                .await?;

        debug!(root_lsn = %root_lsn, last_replay = %last_replay, byte_lag, "resolved byte lag");
        Ok(Some(byte_lag))
    }
}

#[async_trait]
impl ReplicationDataSource for PgReplicationDataSource {
    async fn node_info(&self) -> Result<NodeInfo> {
        let pool = self.pool().await?;

        let row = sqlx::query(NODE_INFO_SQL)
            .fetch_optional(&pool)
            .await?
            .ok_or(ReplicationError::EmptyNodeInfo)?;

        let postmaster_start_time: DateTime<Utc> = row.try_get("postmaster_start_time")?;
        let state: i64 = row.try_get("state")?;
        let location: i64 = row.try_get("location")?;
        let replayed_location: Option<i64> = row.try_get("replayed_location")?;
        let received_location: i64 = row.try_get("received_location")?;
        let paused: bool = row.try_get("paused")?;
        let replayed_timestamp: Option<DateTime<Utc>> = row.try_get("replayed_timestamp")?;
        let summary: Option<serde_json::Value> = row.try_get("replication")?;

        let replication: Vec<ReplicationInfo> = match summary {
            Some(value) if !value.is_null() => serde_json::from_value(value)?,
            _ => Vec::new(),
        };

        let xlog = XlogInfo {
            location,
            received_location,
            replayed_location,
            replayed_timestamp,
            paused,
        }
        .with_received_location_defaulted();

        let byte_lag = self.resolve_byte_lag(&pool).await?.unwrap_or(0);

        Ok(NodeInfo {
            state,
            postmaster_start_time,
            role: NodeRole::from_state_code(state),
            xlog,
            replication,
            byte_lag,
        })
    }

    async fn is_in_recovery(&self) -> Result<bool> {
        let pool = self.pool().await?;
        let in_recovery = sqlx::query_scalar("SELECT pg_catalog.pg_is_in_recovery()")
            .fetch_one(&pool)
            .await?;
        Ok(in_recovery)
    }

    async fn stat_replication(&self) -> Result<Vec<StatReplication>> {
        let pool = self.pool().await?;
        let stats = sqlx::query_as::<_, StatReplication>(STAT_REPLICATION_SQL)
            .fetch_all(&pool)
            .await?;
        Ok(stats)
    }

    async fn replication_slots(&self) -> Result<Vec<ReplicationSlot>> {
        let pool = self.pool().await?;
        let slots = sqlx::query_as::<_, ReplicationSlot>(REPLICATION_SLOTS_SQL)
            .fetch_all(&pool)
            .await?;
        Ok(slots)
    }

    async fn close(&self) {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.take() {
            pool.close().await;
        }
    }
}
