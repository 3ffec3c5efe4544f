//! Cache-aware matching run.
//!
//! Every (cv_hash, job_uid) pair is scored and explained at most once. Later
//! runs hydrate the stored record instead of recomputing it, and each run
//! bumps `view_count` on the pairs it surfaces. A pair that reached
//! `max_views` never re-enters the candidate pool.
//!
//! Explanations are generated lazily while walking the merged ranking, so a
//! run makes at most `top_n` successful explanation calls. A new job whose
//! explanation fails is dropped from the run and nothing is stored for it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MatchSettings;
use crate::embeddings::Embedder;
use crate::errors::AppError;
use crate::explainer::{explain_match, Explainer};
use crate::matching::filter::{apply_filters, FilterOptions};
use crate::matching::ranker::{rank_jobs, sort_by_final_score, ScoringWeights};
use crate::models::candidate::{short_hash, CandidateProfile};
use crate::models::job::Job;
use crate::models::match_result::MatchResult;
use crate::store::MatchStore;

/// Counters of one `compute_matches` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchRunStats {
    pub jobs_considered: usize,
    pub cached_total: usize,
    pub cached_eligible: usize,
    pub cached_missing_jobs: usize,
    pub new_jobs: usize,
    pub new_passed_filters: usize,
    pub explained: usize,
    pub explanation_failures: usize,
    pub results_saved: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MatchRun {
    pub matches: Vec<MatchResult>,
    pub stats: MatchRunStats,
}

/// A ranked entry of the merged pool. Only new entries still need text.
struct Ranked {
    result: MatchResult,
    is_new: bool,
}

#[derive(Clone)]
pub struct MatchEngine {
    store: Arc<dyn MatchStore>,
    embedder: Arc<dyn Embedder>,
    explainer: Arc<dyn Explainer>,
    settings: MatchSettings,
}

impl MatchEngine {
    pub fn new(
        store: Arc<dyn MatchStore>,
        embedder: Arc<dyn Embedder>,
        explainer: Arc<dyn Explainer>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            explainer,
            settings,
        }
    }

    /// Ranks `all_jobs` for the candidate, reusing cached pairs, and records
    /// one more view for every returned match. `max_views <= 0` disables the
    /// exposure limit.
    pub async fn compute_matches(
        &self,
        candidate: &CandidateProfile,
        cv_hash: &str,
        all_jobs: Vec<Job>,
        max_views: i32,
        top_n: usize,
    ) -> Result<MatchRun, AppError> {
        let mut stats = MatchRunStats {
            jobs_considered: all_jobs.len(),
            ..MatchRunStats::default()
        };
        if all_jobs.is_empty() || top_n == 0 {
            return Ok(MatchRun {
                matches: Vec::new(),
                stats,
            });
        }

        let cached_uids = self.store.get_cached_uids(cv_hash).await?;
        let mut eligible = self.store.get_eligible_cached(cv_hash, max_views).await?;
        // Cached but over the limit. Never re-scored.
        let exhausted = self.store.get_excluded_uids(cv_hash, max_views).await?;
        stats.cached_total = cached_uids.len();
        stats.cached_eligible = eligible.len();

        // Hydrate eligible records in pool order so ties stay deterministic.
        let mut cached_results = Vec::with_capacity(eligible.len());
        let mut new_jobs = Vec::new();
        for job in all_jobs {
            if let Some(record) = eligible.remove(&job.uid) {
                cached_results.push(record.hydrate(job));
            } else if !cached_uids.contains(&job.uid) {
                new_jobs.push(job);
            }
        }
        stats.cached_missing_jobs = eligible.len();
        if !eligible.is_empty() {
            debug!(
                missing = eligible.len(),
                "Cached matches whose job is no longer in the pool were skipped"
            );
        }
        stats.new_jobs = new_jobs.len();

        let options = FilterOptions {
            location: None,
            skill_threshold: self.settings.skill_threshold,
            excluded_uids: Some(&exhausted),
            max_views,
        };
        let filtered = apply_filters(new_jobs, candidate, &options);
        stats.new_passed_filters = filtered.len();

        let weights = ScoringWeights::from(&self.settings);
        let new_results = rank_jobs(
            filtered,
            candidate,
            self.embedder.as_ref(),
            self.store.as_ref(),
            &weights,
            None,
        )
        .await?;

        let mut merged: Vec<Ranked> = cached_results
            .into_iter()
            .map(|result| Ranked {
                result,
                is_new: false,
            })
            .chain(new_results.into_iter().map(|result| Ranked {
                result,
                is_new: true,
            }))
            .collect();
        merged.sort_by(|a, b| b.result.final_score.total_cmp(&a.result.final_score));

        let mut selected = Vec::with_capacity(top_n);
        for entry in merged {
            if selected.len() == top_n {
                break;
            }
            if !entry.is_new {
                selected.push(entry.result);
                continue;
            }

            let uid = entry.result.job.uid.clone();
            match explain_match(
                self.explainer.as_ref(),
                entry.result,
                candidate,
                self.settings.skill_threshold,
            )
            .await
            {
                Ok(result) => {
                    stats.explained += 1;
                    selected.push(result);
                }
                Err(e) => {
                    stats.explanation_failures += 1;
                    warn!(job_uid = %uid, "Skipping match, explanation failed: {e}");
                }
            }
        }
        sort_by_final_score(&mut selected);

        if !selected.is_empty() {
            stats.results_saved = self.store.upsert_cached_results(cv_hash, &selected).await?;
        }

        info!(
            cv_hash = short_hash(cv_hash),
            considered = stats.jobs_considered,
            cached = stats.cached_eligible,
            new = stats.new_jobs,
            explained = stats.explained,
            returned = selected.len(),
            "Matching run complete"
        );

        Ok(MatchRun {
            matches: selected,
            stats,
        })
    }
}

/// Uid -> job lookup for hydration of stored results.
pub fn index_jobs(jobs: Vec<Job>) -> HashMap<String, Job> {
    jobs.into_iter().map(|job| (job.uid.clone(), job)).collect()
}
