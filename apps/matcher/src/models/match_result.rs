use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::job::Job;

/// Result of matching a candidate to a job position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub job: Job,
    /// Cosine similarity between CV and job embeddings, clipped to [0, 1].
    pub similarity_score: f64,
    /// Fuzzy skill overlap, normalized to [0, 1].
    pub filter_score: f64,
    /// Weighted blend used for ranking.
    pub final_score: f64,
    pub explanation: Vec<String>,
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub interview_tips: Vec<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
}

/// Stored scoring fields for one (candidate, job) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedMatch {
    pub job_uid: String,
    pub similarity_score: f64,
    pub filter_score: f64,
    pub final_score: f64,
    pub explanation: Vec<String>,
    pub missing_skills: Vec<String>,
    pub interview_tips: Vec<String>,
    pub view_count: i32,
    pub first_shown_at: DateTime<Utc>,
    pub last_shown_at: DateTime<Utc>,
}

impl CachedMatch {
    /// Rebuilds a full result from the stored record, no recomputation.
    pub fn hydrate(&self, job: Job) -> MatchResult {
        let apply_url = job.apply_url();
        MatchResult {
            job,
            similarity_score: self.similarity_score,
            filter_score: self.filter_score,
            final_score: self.final_score,
            explanation: self.explanation.clone(),
            missing_skills: self.missing_skills.clone(),
            interview_tips: self.interview_tips.clone(),
            apply_url,
        }
    }

    /// Record written the first time a pair is surfaced.
    pub fn first_view(result: &MatchResult) -> Self {
        let now = Utc::now();
        CachedMatch {
            job_uid: result.job.uid.clone(),
            similarity_score: result.similarity_score,
            filter_score: result.filter_score,
            final_score: result.final_score,
            explanation: result.explanation.clone(),
            missing_skills: result.missing_skills.clone(),
            interview_tips: result.interview_tips.clone(),
            view_count: 1,
            first_shown_at: now,
            last_shown_at: now,
        }
    }

    /// One more exposure. Scores and texts stay as first computed.
    pub fn record_view(&mut self) {
        self.view_count += 1;
        self.last_shown_at = Utc::now();
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MatchResultRow {
    pub job_uid: String,
    pub similarity_score: f64,
    pub filter_score: f64,
    pub final_score: f64,
    pub explanation: Json<Vec<String>>,
    pub missing_skills: Vec<String>,
    pub interview_tips: Vec<String>,
    pub view_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MatchResultRow> for CachedMatch {
    fn from(row: MatchResultRow) -> Self {
        CachedMatch {
            job_uid: row.job_uid,
            similarity_score: row.similarity_score,
            filter_score: row.filter_score,
            final_score: row.final_score,
            explanation: row.explanation.0,
            missing_skills: row.missing_skills,
            interview_tips: row.interview_tips,
            view_count: row.view_count,
            first_shown_at: row.created_at,
            last_shown_at: row.updated_at,
        }
    }
}
