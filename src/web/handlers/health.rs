//! # Health Check Handlers
//!
//! Role endpoints for load balancers. Every response carries the serialized
//! [`NodeInfo`] snapshot so an operator curling the endpoint sees what the
//! verdict was based on; the status code alone carries the verdict.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::health::HealthChecker;
use crate::web::response_types::ApiResult;
use crate::web::state::AppState;

/// Optional byte-lag budget for the replica endpoint. Absent means
/// unlimited: role alone decides.
#[derive(Debug, Deserialize)]
pub struct LagBudgetQuery {
    pub max_allowable_byte_lag: Option<i64>,
}

/// `GET /` and `GET /primary`
///
/// 200 with the node snapshot when the node is a primary, 503 with the same
/// body otherwise.
pub async fn primary_health(State(state): State<AppState>) -> ApiResult<Response> {
    let info = state.health_checker.node_info().await?;

    let status = if HealthChecker::primary_healthy(&info) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    debug!(role = ?info.role, status = %status, "primary health check");
    Ok((status, Json(info)).into_response())
}

/// `GET /replica?max_allowable_byte_lag=N`
///
/// 200 when the node is a replica within the caller's byte-lag budget, 503
/// otherwise. Without the query parameter any lag passes.
pub async fn replica_health(
    State(state): State<AppState>,
    Query(query): Query<LagBudgetQuery>,
) -> ApiResult<Response> {
    let info = state.health_checker.node_info().await?;

    let status = if HealthChecker::replica_healthy(&info, query.max_allowable_byte_lag) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    debug!(
        role = ?info.role,
        byte_lag = info.byte_lag,
        budget = ?query.max_allowable_byte_lag,
        status = %status,
        "replica health check"
    );
    Ok((status, Json(info)).into_response())
}

/// `GET /slot/:slot_name`
///
/// 200 when the named standby is connected and within the flush-lag budget;
/// 404 when no sender matches the name; 503 when the lag is too high.
pub async fn slot_health(
    State(state): State<AppState>,
    Path(slot_name): Path<String>,
) -> ApiResult<Response> {
    state.health_checker.check_replication_slot(&slot_name).await?;

    Ok(Json(json!({ "status": "ok", "slot": slot_name })).into_response())
}
