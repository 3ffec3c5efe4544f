use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::candidate::CandidateProfile;
use crate::models::job::Job;
use crate::models::match_result::{CachedMatch, MatchResult};
use crate::store::MatchStore;

#[derive(Default)]
struct MemoryState {
    /// Keyed by uid so iteration matches the Postgres `ORDER BY uid`.
    jobs: BTreeMap<String, Job>,
    embeddings: HashMap<String, Vec<f32>>,
    candidate: Option<(String, CandidateProfile)>,
    /// cv_hash -> job_uid -> record
    results: HashMap<String, HashMap<String, CachedMatch>>,
}

/// Process-local store. Same semantics as `PgMatchStore`, nothing survives a
/// restart.
#[derive(Default)]
pub struct MemoryMatchStore {
    state: RwLock<MemoryState>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for a pair, for inspection.
    #[cfg(test)]
    pub async fn cached(&self, cv_hash: &str, job_uid: &str) -> Option<CachedMatch> {
        let state = self.state.read().await;
        state
            .results
            .get(cv_hash)
            .and_then(|records| records.get(job_uid))
            .cloned()
    }

    /// Writes a record as-is, replacing any existing one.
    #[cfg(test)]
    pub async fn insert_cached(&self, cv_hash: &str, record: CachedMatch) {
        let mut state = self.state.write().await;
        state
            .results
            .entry(cv_hash.to_string())
            .or_default()
            .insert(record.job_uid.clone(), record);
    }

    #[cfg(test)]
    pub async fn record_count(&self, cv_hash: &str) -> usize {
        let state = self.state.read().await;
        state.results.get(cv_hash).map_or(0, HashMap::len)
    }
}

fn location_matches(job: &Job, wanted: &str) -> bool {
    let job_location = job.location.as_deref().unwrap_or("").to_lowercase();
    let workplace = job.workplace_type.as_deref().unwrap_or("").to_lowercase();
    job_location.contains(wanted) || job_location.contains("remote") || workplace.contains("remote")
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn get_jobs(&self, location: Option<&str>) -> Result<Vec<Job>, AppError> {
        let state = self.state.read().await;
        let wanted = location
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty());
        Ok(state
            .jobs
            .values()
            .filter(|job| wanted.as_deref().map_or(true, |w| location_matches(job, w)))
            .cloned()
            .collect())
    }

    async fn get_jobs_by_uids(&self, uids: &[String]) -> Result<Vec<Job>, AppError> {
        let state = self.state.read().await;
        Ok(uids
            .iter()
            .filter_map(|uid| state.jobs.get(uid).cloned())
            .collect())
    }

    async fn upsert_jobs(&self, jobs: &[Job]) -> Result<usize, AppError> {
        let mut state = self.state.write().await;
        for job in jobs {
            state.jobs.insert(job.uid.clone(), job.clone());
        }
        Ok(jobs.len())
    }

    async fn get_job_embeddings(
        &self,
        uids: &[String],
    ) -> Result<HashMap<String, Vec<f32>>, AppError> {
        let state = self.state.read().await;
        Ok(uids
            .iter()
            .filter_map(|uid| {
                state
                    .embeddings
                    .get(uid)
                    .map(|vector| (uid.clone(), vector.clone()))
            })
            .collect())
    }

    async fn store_job_embeddings(
        &self,
        embeddings: &[(String, Vec<f32>)],
    ) -> Result<usize, AppError> {
        let mut state = self.state.write().await;
        for (uid, vector) in embeddings {
            state.embeddings.insert(uid.clone(), vector.clone());
        }
        Ok(embeddings.len())
    }

    async fn get_unembedded_jobs(&self) -> Result<Vec<Job>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .values()
            .filter(|job| !state.embeddings.contains_key(&job.uid))
            .cloned()
            .collect())
    }

    async fn get_candidate(&self) -> Result<Option<(String, CandidateProfile)>, AppError> {
        Ok(self.state.read().await.candidate.clone())
    }

    async fn get_candidate_by_hash(
        &self,
        cv_hash: &str,
    ) -> Result<Option<CandidateProfile>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .candidate
            .as_ref()
            .filter(|(hash, _)| hash == cv_hash)
            .map(|(_, profile)| profile.clone()))
    }

    async fn save_candidate(
        &self,
        cv_hash: &str,
        profile: &CandidateProfile,
    ) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        state.candidate = Some((cv_hash.to_string(), profile.clone()));
        Ok(())
    }

    async fn get_cached_uids(&self, cv_hash: &str) -> Result<HashSet<String>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .results
            .get(cv_hash)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_eligible_cached(
        &self,
        cv_hash: &str,
        max_views: i32,
    ) -> Result<HashMap<String, CachedMatch>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .results
            .get(cv_hash)
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, record)| max_views <= 0 || record.view_count < max_views)
                    .map(|(uid, record)| (uid.clone(), record.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_excluded_uids(
        &self,
        cv_hash: &str,
        max_views: i32,
    ) -> Result<HashSet<String>, AppError> {
        if max_views <= 0 {
            return Ok(HashSet::new());
        }
        let state = self.state.read().await;
        Ok(state
            .results
            .get(cv_hash)
            .map(|records| {
                records
                    .values()
                    .filter(|record| record.view_count >= max_views)
                    .map(|record| record.job_uid.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_cached_results(
        &self,
        cv_hash: &str,
        results: &[MatchResult],
    ) -> Result<usize, AppError> {
        let mut state = self.state.write().await;
        let records = state.results.entry(cv_hash.to_string()).or_default();
        for result in results {
            records
                .entry(result.job.uid.clone())
                .and_modify(CachedMatch::record_view)
                .or_insert_with(|| CachedMatch::first_view(result));
        }
        Ok(results.len())
    }

    async fn get_match_results(
        &self,
        cv_hash: &str,
        limit: i64,
    ) -> Result<Vec<CachedMatch>, AppError> {
        let state = self.state.read().await;
        let mut records: Vec<CachedMatch> = state
            .results
            .get(cv_hash)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.job_uid.cmp(&b.job_uid))
        });
        records.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(records)
    }
}
