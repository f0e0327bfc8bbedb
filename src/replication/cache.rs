//! Time-bounded caching decorator.
//!
//! Health-check pollers (several load balancers, each on its own interval)
//! would otherwise hit PostgreSQL with the full query set on every request.
//! The decorator holds the last successful result of each facade operation
//! for one TTL window, collapsing a burst of concurrent polls into a single
//! upstream query.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::ReplicationDataSource;
use crate::error::Result;
use crate::models::{NodeInfo, ReplicationSlot, StatReplication};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1);

/// One `{value, expires_at}` pair. A freshly constructed slot holds no
/// value and an already-elapsed expiry, so the first read always fetches.
#[derive(Debug)]
struct CacheSlot<T> {
    value: Option<T>,
    expires_at: Instant,
}

impl<T: Clone> CacheSlot<T> {
    fn new() -> Self {
        Self {
            value: None,
            expires_at: Instant::now(),
        }
    }

    /// The cached value, if any and not yet expired.
    fn fresh(&self, now: Instant) -> Option<T> {
        if now < self.expires_at {
            self.value.clone()
        } else {
            None
        }
    }

    /// Overwrite the value and extend the expiry. Only called after a
    /// successful fetch; a failed refresh leaves the slot untouched.
    fn store(&mut self, value: T, expires_at: Instant) {
        self.value = Some(value);
        self.expires_at = expires_at;
    }
}

/// All four slots behind one lock. Coarse on purpose: a slow refresh of one
/// operation blocks reads of the others, the accepted cost of keeping the
/// slots from drifting apart under concurrent refreshes.
struct CacheState {
    node_info: CacheSlot<NodeInfo>,
    in_recovery: CacheSlot<bool>,
    stat_replication: CacheSlot<Vec<StatReplication>>,
    replication_slots: CacheSlot<Vec<ReplicationSlot>>,
}

/// TTL caching decorator around any [`ReplicationDataSource`].
///
/// Refreshes are mutually exclusive per the shared lock; waiters queued
/// behind a refreshing holder observe the holder's result. Stale data is
/// never served past its TTL: an expired slot with a failing source is an
/// error, not a silently returned old value.
pub struct CachedDataSource<S> {
    inner: S,
    ttl: Duration,
    cache: Mutex<CacheState>,
}

impl<S: ReplicationDataSource> CachedDataSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    /// The wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(CacheState {
                node_info: CacheSlot::new(),
                in_recovery: CacheSlot::new(),
                stat_replication: CacheSlot::new(),
                replication_slots: CacheSlot::new(),
            }),
        }
    }
}

#[async_trait]
impl<S: ReplicationDataSource> ReplicationDataSource for CachedDataSource<S> {
    async fn node_info(&self) -> Result<NodeInfo> {
        let mut cache = self.cache.lock().await;
        if let Some(value) = cache.node_info.fresh(Instant::now()) {
            debug!("node_info served from cache");
            return Ok(value);
        }
        let value = self.inner.node_info().await?;
        cache.node_info.store(value.clone(), Instant::now() + self.ttl);
        Ok(value)
    }

    async fn is_in_recovery(&self) -> Result<bool> {
        let mut cache = self.cache.lock().await;
        if let Some(value) = cache.in_recovery.fresh(Instant::now()) {
            return Ok(value);
        }
        let value = self.inner.is_in_recovery().await?;
        cache.in_recovery.store(value, Instant::now() + self.ttl);
        Ok(value)
    }

    async fn stat_replication(&self) -> Result<Vec<StatReplication>> {
        let mut cache = self.cache.lock().await;
        if let Some(value) = cache.stat_replication.fresh(Instant::now()) {
            return Ok(value);
        }
        let value = self.inner.stat_replication().await?;
        cache
            .stat_replication
            .store(value.clone(), Instant::now() + self.ttl);
        Ok(value)
    }

    async fn replication_slots(&self) -> Result<Vec<ReplicationSlot>> {
        let mut cache = self.cache.lock().await;
        if let Some(value) = cache.replication_slots.fresh(Instant::now()) {
            return Ok(value);
        }
        let value = self.inner.replication_slots().await?;
        cache
            .replication_slots
            .store(value.clone(), Instant::now() + self.ttl);
        Ok(value)
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
