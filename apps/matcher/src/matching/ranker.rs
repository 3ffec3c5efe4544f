use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MatchSettings;
use crate::embeddings::Embedder;
use crate::errors::AppError;
use crate::matching::filter::FilteredJob;
use crate::models::candidate::CandidateProfile;
use crate::models::match_result::MatchResult;
use crate::store::MatchStore;

/// Blend of the two signals. Weights sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub filter: f64,
    pub similarity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            filter: 0.4,
            similarity: 0.6,
        }
    }
}

impl From<&MatchSettings> for ScoringWeights {
    fn from(settings: &MatchSettings) -> Self {
        Self {
            filter: settings.filter_weight(),
            similarity: settings.similarity_weight,
        }
    }
}

/// Cosine similarity of two vectors. Zero for empty, zero-norm or
/// mismatched-length inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Similarity of the candidate vector against each job vector, clipped to
/// [0, 1]. Opposed vectors count as unrelated, not as an anti-match.
pub fn compute_similarities_batch(candidate: &[f32], jobs: &[&[f32]]) -> Vec<f64> {
    jobs.iter()
        .map(|job| cosine_similarity(candidate, job).clamp(0.0, 1.0))
        .collect()
}

/// `filter_score` is on the 0-100 scale produced by the skill filter.
pub fn compute_final_score(filter_score: f64, similarity: f64, weights: &ScoringWeights) -> f64 {
    (weights.filter * (filter_score / 100.0) + weights.similarity * similarity).clamp(0.0, 1.0)
}

/// Scores the filtered jobs against already-loaded vectors and sorts them by
/// `final_score` descending. Jobs without a vector get similarity 0. The
/// sort is stable, so ties keep their input order.
pub fn score_filtered_jobs(
    filtered: Vec<FilteredJob>,
    candidate_vector: &[f32],
    job_vectors: &HashMap<String, Vec<f32>>,
    weights: &ScoringWeights,
) -> Vec<MatchResult> {
    let (with_vector, vectors): (Vec<usize>, Vec<&[f32]>) = filtered
        .iter()
        .enumerate()
        .filter_map(|(i, f)| job_vectors.get(&f.job.uid).map(|v| (i, v.as_slice())))
        .unzip();

    let mut similarities = vec![0.0_f64; filtered.len()];
    for (i, score) in with_vector
        .into_iter()
        .zip(compute_similarities_batch(candidate_vector, &vectors))
    {
        similarities[i] = score;
    }

    let mut results: Vec<MatchResult> = filtered
        .into_iter()
        .zip(similarities)
        .map(|(FilteredJob { job, skill_score }, similarity_score)| {
            let final_score = compute_final_score(skill_score, similarity_score, weights);
            MatchResult {
                apply_url: job.apply_url(),
                job,
                similarity_score,
                filter_score: (skill_score / 100.0).clamp(0.0, 1.0),
                final_score,
                explanation: Vec::new(),
                missing_skills: Vec::new(),
                interview_tips: Vec::new(),
            }
        })
        .collect();

    sort_by_final_score(&mut results);
    results
}

/// Stable descending sort on `final_score`.
pub fn sort_by_final_score(results: &mut [MatchResult]) {
    results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
}

/// Embeds the candidate once, batch-loads the job vectors and ranks the
/// filtered jobs. `top_n` truncates the ranking when set.
pub async fn rank_jobs(
    filtered: Vec<FilteredJob>,
    candidate: &CandidateProfile,
    embedder: &dyn Embedder,
    store: &dyn MatchStore,
    weights: &ScoringWeights,
    top_n: Option<usize>,
) -> Result<Vec<MatchResult>, AppError> {
    if filtered.is_empty() {
        return Ok(Vec::new());
    }

    let candidate_vector = embedder.embed(&candidate.embedding_text()).await?;

    let uids: Vec<String> = filtered.iter().map(|f| f.job.uid.clone()).collect();
    let job_vectors = store.get_job_embeddings(&uids).await?;
    let missing = uids.len() - job_vectors.len().min(uids.len());
    if missing > 0 {
        warn!(missing, "Jobs without stored embeddings ranked on filter score alone");
    }

    let mut results = score_filtered_jobs(filtered, &candidate_vector, &job_vectors, weights);
    if let Some(n) = top_n {
        results.truncate(n);
    }

    debug!(ranked = results.len(), "Ranked filtered jobs");
    Ok(results)
}
