use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::candidates::extractor::extract_text_blocking;
use crate::errors::AppError;
use crate::matching::pipeline::get_or_parse_candidate;
use crate::models::candidate::{short_hash, CandidateProfile};
use crate::state::AppState;

const CV_FIELD: &str = "cv";

#[derive(Serialize)]
pub struct CandidateResponse {
    pub cv_hash: String,
    pub cached: bool,
    pub profile: CandidateProfile,
}

/// POST /api/v1/candidate
/// Multipart upload with the PDF in the `cv` field.
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CandidateResponse>, AppError> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some(CV_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("could not read CV upload: {e}")))?;
            document = Some(bytes);
            break;
        }
    }
    let document = document
        .ok_or_else(|| AppError::Validation(format!("missing multipart field '{CV_FIELD}'")))?;

    let cv_text = extract_text_blocking(document).await?;
    let resolved =
        get_or_parse_candidate(state.store.as_ref(), state.profile_parser.as_ref(), &cv_text)
            .await?;

    Ok(Json(CandidateResponse {
        cv_hash: short_hash(&resolved.cv_hash).to_string(),
        cached: resolved.cached,
        profile: resolved.profile,
    }))
}

/// GET /api/v1/candidate
pub async fn handle_get_candidate(
    State(state): State<AppState>,
) -> Result<Json<CandidateResponse>, AppError> {
    let (cv_hash, profile) = state
        .store
        .get_candidate()
        .await?
        .ok_or_else(|| AppError::NotFound("No candidate has been uploaded".to_string()))?;

    Ok(Json(CandidateResponse {
        cv_hash: short_hash(&cv_hash).to_string(),
        cached: true,
        profile,
    }))
}
