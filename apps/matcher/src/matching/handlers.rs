use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::matching::pipeline::{
    ingest_jobs, IngestStats, RunOptions, ScheduledRun, StoredMatch,
};
use crate::models::job::Job;
use crate::state::AppState;

const DEFAULT_RESULTS_LIMIT: i64 = 20;
const MAX_RESULTS_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct ResultsQuery {
    pub limit: Option<i64>,
}

/// POST /api/v1/jobs
pub async fn handle_ingest_jobs(
    State(state): State<AppState>,
    Json(jobs): Json<Vec<Job>>,
) -> Result<Json<IngestStats>, AppError> {
    let stats = ingest_jobs(state.store.as_ref(), state.embedder.as_ref(), &jobs).await?;
    Ok(Json(stats))
}

/// POST /api/v1/matches/run
/// The JSON body is optional; without one the configured defaults apply.
pub async fn handle_run_matching(
    State(state): State<AppState>,
    payload: Result<Json<RunOptions>, JsonRejection>,
) -> Result<Json<ScheduledRun>, AppError> {
    let options = match payload {
        Ok(Json(options)) => options,
        Err(JsonRejection::MissingJsonContentType(_)) => RunOptions::default(),
        Err(e) => return Err(AppError::Validation(e.body_text())),
    };
    let run = state.pipeline().run_scheduled_matching(&options).await?;
    Ok(Json(run))
}

/// GET /api/v1/matches?limit=
pub async fn handle_get_matches(
    State(state): State<AppState>,
    Query(params): Query<ResultsQuery>,
) -> Result<Json<Vec<StoredMatch>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RESULTS_LIMIT)
        .clamp(1, MAX_RESULTS_LIMIT);
    let matches = state.pipeline().get_match_results(limit).await?;
    Ok(Json(matches))
}
