//! # Web API Application State
//!
//! Shared state for the HTTP handlers: the health checker and the (cached)
//! replication data source behind it.

use std::sync::Arc;

use crate::health::HealthChecker;
use crate::replication::ReplicationDataSource;

#[derive(Clone)]
pub struct AppState {
    pub health_checker: Arc<HealthChecker>,
}

impl AppState {
    pub fn new(data_source: Arc<dyn ReplicationDataSource>) -> Self {
        Self {
            health_checker: Arc::new(HealthChecker::new(data_source)),
        }
    }
}
