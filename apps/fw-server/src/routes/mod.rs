mod drift;
mod runs;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/runs", post(runs::ingest_run).get(runs::list_runs))
        .route("/v1/runs/{id}", get(runs::get_run))
        .route("/v1/runs/{id}/steps", get(runs::get_run_steps))
        .route("/v1/runs/{id}/failures", get(runs::get_run_failures))
        .route("/v1/stats", get(runs::stats))
        .route("/v1/drift/profiles", get(drift::list_profiles))
        .route("/v1/drift/profiles/{id}", get(drift::get_profile))
        .route("/v1/drift/baselines", get(drift::list_baselines))
        .route("/v1/drift/baselines/{id}", get(drift::get_baseline))
        .route("/v1/drift/timeline", get(drift::drift_timeline))
        .route("/v1/drift/summary", get(drift::drift_summary))
        .route("/v1/drift", get(drift::list_drift))
        .route("/v1/drift/{id}", get(drift::get_drift))
        .route("/v1/drift/{id}/resolve", post(drift::resolve_drift))
        .with_state(state)
}
