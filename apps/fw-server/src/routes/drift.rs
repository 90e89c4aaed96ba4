use crate::error::{self, ApiError};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use fw_model::{BaselineId, BehaviorBaseline, BehaviorDrift, BehaviorProfile, DriftId, DriftSeverity, DriftType, ProfileId};
use fw_store::{DriftFilter, DriftSummary};
use serde::Deserialize;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[derive(Debug, Deserialize)]
pub struct AgentScopedQuery {
    agent_id: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

pub async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<AgentScopedQuery>,
) -> Result<Json<Vec<BehaviorProfile>>, ApiError> {
    let profiles = state
        .store
        .list_profiles(query.agent_id.as_deref(), clamp_limit(query.limit), query.offset.unwrap_or(0))
        .map_err(|e| error::from_store("/v1/drift/profiles", e))?;
    Ok(Json(profiles))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<ProfileId>,
) -> Result<Json<BehaviorProfile>, ApiError> {
    state
        .store
        .get_profile(profile_id)
        .map_err(|e| error::from_store("/v1/drift/profiles/{id}", e))?
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found("/v1/drift/profiles/{id}", format!("profile {profile_id} not found"))
        })
}

pub async fn list_baselines(
    State(state): State<AppState>,
    Query(query): Query<AgentScopedQuery>,
) -> Result<Json<Vec<BehaviorBaseline>>, ApiError> {
    let baselines = state
        .store
        .list_baselines(query.agent_id.as_deref(), clamp_limit(query.limit), query.offset.unwrap_or(0))
        .map_err(|e| error::from_store("/v1/drift/baselines", e))?;
    Ok(Json(baselines))
}

pub async fn get_baseline(
    State(state): State<AppState>,
    Path(baseline_id): Path<BaselineId>,
) -> Result<Json<BehaviorBaseline>, ApiError> {
    state
        .store
        .get_baseline(baseline_id)
        .map_err(|e| error::from_store("/v1/drift/baselines/{id}", e))?
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found("/v1/drift/baselines/{id}", format!("baseline {baseline_id} not found"))
        })
}

#[derive(Debug, Deserialize)]
pub struct DriftQuery {
    agent_id: Option<String>,
    agent_version: Option<String>,
    environment: Option<String>,
    drift_type: Option<DriftType>,
    severity: Option<DriftSeverity>,
    resolved: Option<bool>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl From<DriftQuery> for DriftFilter {
    fn from(q: DriftQuery) -> Self {
        DriftFilter {
            agent_id: q.agent_id,
            agent_version: q.agent_version,
            environment: q.environment,
            drift_type: q.drift_type,
            severity: q.severity,
            resolved: q.resolved,
            start_time: q.start_time,
            end_time: q.end_time,
            limit: clamp_limit(q.limit),
            offset: q.offset.unwrap_or(0),
        }
    }
}

pub async fn list_drift(
    State(state): State<AppState>,
    Query(query): Query<DriftQuery>,
) -> Result<Json<Vec<BehaviorDrift>>, ApiError> {
    let events = state
        .store
        .list_drift(&query.into())
        .map_err(|e| error::from_store("/v1/drift", e))?;
    Ok(Json(events))
}

pub async fn get_drift(
    State(state): State<AppState>,
    Path(drift_id): Path<DriftId>,
) -> Result<Json<BehaviorDrift>, ApiError> {
    state
        .store
        .get_drift_event(drift_id)
        .map_err(|e| error::from_store("/v1/drift/{id}", e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("/v1/drift/{id}", format!("drift event {drift_id} not found")))
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    agent_id: String,
}

pub async fn drift_timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Vec<BehaviorDrift>>, ApiError> {
    let events = state
        .store
        .list_drift_for_agent(&query.agent_id)
        .map_err(|e| error::from_store("/v1/drift/timeline", e))?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    days: Option<i64>,
}

pub async fn drift_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<DriftSummary>, ApiError> {
    let summary = state
        .store
        .drift_summary(query.days.unwrap_or(7))
        .map_err(|e| error::from_store("/v1/drift/summary", e))?;
    Ok(Json(summary))
}

pub async fn resolve_drift(
    State(state): State<AppState>,
    Path(drift_id): Path<DriftId>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .get_drift_event(drift_id)
        .map_err(|e| error::from_store("/v1/drift/{id}/resolve", e))?
        .ok_or_else(|| {
            ApiError::not_found("/v1/drift/{id}/resolve", format!("drift event {drift_id} not found"))
        })?;
    state
        .store
        .resolve_drift_event(drift_id)
        .map_err(|e| error::from_store("/v1/drift/{id}/resolve", e))?;
    Ok(StatusCode::NO_CONTENT)
}
