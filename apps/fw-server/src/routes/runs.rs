use crate::error::{self, ApiError};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use fw_model::{AgentFailure, AgentRun, AgentStep, RunId, RunStatus};
use fw_store::{RunFilter, RunStats};
use serde::Deserialize;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    agent_id: Option<String>,
    agent_version: Option<String>,
    environment: Option<String>,
    status: Option<RunStatus>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl From<RunQuery> for RunFilter {
    fn from(q: RunQuery) -> Self {
        RunFilter {
            agent_id: q.agent_id,
            agent_version: q.agent_version,
            environment: q.environment,
            status: q.status,
            start_time: q.start_time,
            end_time: q.end_time,
            limit: clamp_limit(q.limit),
            offset: q.offset.unwrap_or(0),
        }
    }
}

/// `POST /v1/runs` — idempotent ingest. `201` for a newly stored run, `200`
/// when `run_id` was already present (the stored copy is returned either way).
pub async fn ingest_run(
    State(state): State<AppState>,
    Json(run): Json<AgentRun>,
) -> Result<(StatusCode, Json<AgentRun>), ApiError> {
    let existed = state
        .store
        .get_run(run.run_id)
        .map_err(|e| error::from_store("/v1/runs", e))?
        .is_some();
    let stored = state
        .store
        .put_run(&run)
        .map_err(|e| error::from_store("/v1/runs", e))?;
    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(stored)))
}

pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> Result<Json<Vec<AgentRun>>, ApiError> {
    let runs = state
        .store
        .list_runs(&query.into())
        .map_err(|e| error::from_store("/v1/runs", e))?;
    Ok(Json(runs))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> Result<Json<AgentRun>, ApiError> {
    state
        .store
        .get_run(run_id)
        .map_err(|e| error::from_store("/v1/runs/{id}", e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("/v1/runs/{id}", format!("run {run_id} not found")))
}

pub async fn get_run_steps(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> Result<Json<Vec<AgentStep>>, ApiError> {
    let run = state
        .store
        .get_run(run_id)
        .map_err(|e| error::from_store("/v1/runs/{id}/steps", e))?
        .ok_or_else(|| {
            ApiError::not_found("/v1/runs/{id}/steps", format!("run {run_id} not found"))
        })?;
    Ok(Json(run.steps))
}

pub async fn get_run_failures(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> Result<Json<Vec<AgentFailure>>, ApiError> {
    let run = state
        .store
        .get_run(run_id)
        .map_err(|e| error::from_store("/v1/runs/{id}/failures", e))?
        .ok_or_else(|| {
            ApiError::not_found("/v1/runs/{id}/failures", format!("run {run_id} not found"))
        })?;
    Ok(Json(run.failure.into_iter().collect()))
}

pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> Result<Json<RunStats>, ApiError> {
    let stats = state
        .store
        .run_stats(&query.into())
        .map_err(|e| error::from_store("/v1/stats", e))?;
    Ok(Json(stats))
}
