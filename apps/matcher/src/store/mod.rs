//! Persistence seam for jobs, job embeddings, the candidate and cached match
//! records. One implementation per backend: PostgreSQL in production, an
//! in-memory map for tests and local runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::candidate::CandidateProfile;
use crate::models::job::Job;
use crate::models::match_result::{CachedMatch, MatchResult};

pub mod memory;
pub mod postgres;

pub use memory::MemoryMatchStore;
pub use postgres::PgMatchStore;

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// All jobs, or only those whose location contains `location` or that
    /// are remote (case-insensitive). Ordered by uid.
    async fn get_jobs(&self, location: Option<&str>) -> Result<Vec<Job>, AppError>;

    /// Jobs for the given uids. Unknown uids are skipped.
    async fn get_jobs_by_uids(&self, uids: &[String]) -> Result<Vec<Job>, AppError>;

    /// Inserts or refreshes postings by uid. Returns the number written.
    async fn upsert_jobs(&self, jobs: &[Job]) -> Result<usize, AppError>;

    async fn get_job_embeddings(
        &self,
        uids: &[String],
    ) -> Result<HashMap<String, Vec<f32>>, AppError>;

    async fn store_job_embeddings(&self, embeddings: &[(String, Vec<f32>)])
        -> Result<usize, AppError>;

    /// Jobs that have no stored embedding yet.
    async fn get_unembedded_jobs(&self) -> Result<Vec<Job>, AppError>;

    /// The single stored candidate, if any.
    async fn get_candidate(&self) -> Result<Option<(String, CandidateProfile)>, AppError>;

    async fn get_candidate_by_hash(
        &self,
        cv_hash: &str,
    ) -> Result<Option<CandidateProfile>, AppError>;

    /// Replaces any existing candidate.
    async fn save_candidate(&self, cv_hash: &str, profile: &CandidateProfile)
        -> Result<(), AppError>;

    /// Every job uid ever scored for this candidate, whatever its view count.
    async fn get_cached_uids(&self, cv_hash: &str) -> Result<HashSet<String>, AppError>;

    /// Cached records with `view_count < max_views`, or all of them when
    /// `max_views <= 0`.
    async fn get_eligible_cached(
        &self,
        cv_hash: &str,
        max_views: i32,
    ) -> Result<HashMap<String, CachedMatch>, AppError>;

    /// Uids shown at least `max_views` times. Empty when `max_views <= 0`.
    async fn get_excluded_uids(
        &self,
        cv_hash: &str,
        max_views: i32,
    ) -> Result<HashSet<String>, AppError>;

    /// Inserts new pairs with `view_count = 1`. Existing pairs only get their
    /// view count bumped; their scores and texts are never overwritten.
    /// Returns the number of records touched.
    async fn upsert_cached_results(
        &self,
        cv_hash: &str,
        results: &[MatchResult],
    ) -> Result<usize, AppError>;

    /// Stored records for the candidate, best `final_score` first.
    async fn get_match_results(
        &self,
        cv_hash: &str,
        limit: i64,
    ) -> Result<Vec<CachedMatch>, AppError>;
}

