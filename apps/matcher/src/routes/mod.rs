pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::candidates::handlers as candidate_handlers;
use crate::matching::handlers as matching_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Candidate API
        .route(
            "/api/v1/candidate",
            post(candidate_handlers::handle_upload_cv).get(candidate_handlers::handle_get_candidate),
        )
        // Jobs & matching API
        .route("/api/v1/jobs", post(matching_handlers::handle_ingest_jobs))
        .route(
            "/api/v1/matches/run",
            post(matching_handlers::handle_run_matching),
        )
        .route("/api/v1/matches", get(matching_handlers::handle_get_matches))
        .with_state(state)
}
