use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::candidates::parser::ProfileParser;
use crate::config::MatchSettings;
use crate::embeddings::Embedder;
use crate::errors::AppError;
use crate::explainer::Explainer;
use crate::matching::cache::{index_jobs, MatchEngine};
use crate::matching::filter::filter_by_location;
use crate::matching::text::extract_details_text;
use crate::models::candidate::{compute_cv_hash, short_hash, CandidateProfile};
use crate::models::job::Job;
use crate::models::match_result::MatchResult;
use crate::store::MatchStore;

// ────────────────────────────────────────────────────────────────────────────
// Candidate resolution
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCandidate {
    pub cv_hash: String,
    pub profile: CandidateProfile,
    /// True when the profile came from the store and no parse was needed.
    pub cached: bool,
}

/// Returns the stored profile for this exact CV text, or parses and stores
/// it as the new current candidate.
pub async fn get_or_parse_candidate(
    store: &dyn MatchStore,
    parser: &dyn ProfileParser,
    cv_text: &str,
) -> Result<ResolvedCandidate, AppError> {
    if cv_text.trim().is_empty() {
        return Err(AppError::Validation("CV text is empty".to_string()));
    }

    let cv_hash = compute_cv_hash(cv_text);
    if let Some(profile) = store.get_candidate_by_hash(&cv_hash).await? {
        info!(cv_hash = short_hash(&cv_hash), "Using cached candidate profile");
        return Ok(ResolvedCandidate {
            cv_hash,
            profile,
            cached: true,
        });
    }

    let profile = parser.parse_profile(cv_text).await?;
    store.save_candidate(&cv_hash, &profile).await?;
    info!(cv_hash = short_hash(&cv_hash), "Stored new candidate profile");

    Ok(ResolvedCandidate {
        cv_hash,
        profile,
        cached: false,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Job ingestion
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub jobs_upserted: usize,
    pub jobs_embedded: usize,
}

/// Text embedded for a posting: the title, then the detail sections.
pub fn job_embedding_text(job: &Job) -> String {
    let details = extract_details_text(&job.details);
    if details.is_empty() {
        job.name.clone()
    } else {
        format!("{}\n\n{}", job.name, details)
    }
}

/// Inputs per embedding request. OpenAI-compatible providers cap the batch.
const EMBED_BATCH_SIZE: usize = 100;

/// Embeds every stored job that has no vector yet, `EMBED_BATCH_SIZE` jobs
/// per request. Each chunk is stored as soon as it is embedded, so a failure
/// keeps the progress of earlier chunks.
pub async fn embed_missing_jobs(
    store: &dyn MatchStore,
    embedder: &dyn Embedder,
) -> Result<usize, AppError> {
    let pending = store.get_unembedded_jobs().await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let mut stored = 0;
    for chunk in pending.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = chunk.iter().map(job_embedding_text).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != chunk.len() {
            return Err(AppError::Embedding(format!(
                "expected {} vectors, got {}",
                chunk.len(),
                vectors.len()
            )));
        }

        let embeddings: Vec<(String, Vec<f32>)> = chunk
            .iter()
            .map(|job| job.uid.clone())
            .zip(vectors)
            .collect();
        stored += store.store_job_embeddings(&embeddings).await?;
        debug!(stored, pending = pending.len(), "Stored job embedding chunk");
    }

    info!(stored, "Embedded new job postings");
    Ok(stored)
}

/// Upserts postings, then backfills their embeddings. A failed backfill is
/// logged and retried on the next ingestion or run.
pub async fn ingest_jobs(
    store: &dyn MatchStore,
    embedder: &dyn Embedder,
    jobs: &[Job],
) -> Result<IngestStats, AppError> {
    if let Some(job) = jobs.iter().find(|job| job.uid.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "job '{}' has an empty uid",
            job.name
        )));
    }

    let jobs_upserted = store.upsert_jobs(jobs).await?;
    let jobs_embedded = match embed_missing_jobs(store, embedder).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Job embedding backfill failed: {e}");
            0
        }
    };

    Ok(IngestStats {
        jobs_upserted,
        jobs_embedded,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Matching runs
// ────────────────────────────────────────────────────────────────────────────

/// Per-run overrides of the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub max_views: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub candidate_found: bool,
    pub jobs_considered: usize,
    pub matches_generated: usize,
    pub results_saved: usize,
    pub explanation_failures: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduledRun {
    pub stats: RunStats,
    pub matches: Vec<MatchResult>,
}

/// A stored result with its job and exposure history.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMatch {
    #[serde(flatten)]
    pub result: MatchResult,
    pub view_count: i32,
    pub first_shown_at: DateTime<Utc>,
    pub last_shown_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MatchPipeline {
    store: Arc<dyn MatchStore>,
    embedder: Arc<dyn Embedder>,
    engine: MatchEngine,
    settings: MatchSettings,
}

impl MatchPipeline {
    pub fn new(
        store: Arc<dyn MatchStore>,
        embedder: Arc<dyn Embedder>,
        explainer: Arc<dyn Explainer>,
        settings: MatchSettings,
    ) -> Self {
        let engine = MatchEngine::new(
            store.clone(),
            embedder.clone(),
            explainer,
            settings.clone(),
        );
        Self {
            store,
            embedder,
            engine,
            settings,
        }
    }

    /// Matches the stored candidate against the job pool. With no stored
    /// candidate the run is a no-op reported through `candidate_found`.
    pub async fn run_scheduled_matching(
        &self,
        options: &RunOptions,
    ) -> Result<ScheduledRun, AppError> {
        let top_n = options.top_n.unwrap_or(self.settings.top_n);
        if top_n == 0 {
            return Err(AppError::Validation("top_n must be at least 1".to_string()));
        }
        let max_views = options.max_views.unwrap_or(self.settings.max_job_views);
        if max_views < 0 {
            return Err(AppError::Validation(
                "max_views must not be negative".to_string(),
            ));
        }

        let Some((cv_hash, candidate)) = self.store.get_candidate().await? else {
            info!("No candidate stored, skipping matching run");
            return Ok(ScheduledRun::default());
        };

        if let Err(e) = embed_missing_jobs(self.store.as_ref(), self.embedder.as_ref()).await {
            warn!("Embedding backfill before run failed, continuing: {e}");
        }

        let location = options
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        let jobs = filter_by_location(self.store.get_jobs(location).await?, location);

        let run = self
            .engine
            .compute_matches(&candidate, &cv_hash, jobs, max_views, top_n)
            .await?;

        let stats = RunStats {
            candidate_found: true,
            jobs_considered: run.stats.jobs_considered,
            matches_generated: run.matches.len(),
            results_saved: run.stats.results_saved,
            explanation_failures: run.stats.explanation_failures,
        };
        Ok(ScheduledRun {
            stats,
            matches: run.matches,
        })
    }

    /// Stored results of the current candidate, best first, hydrated with
    /// their jobs. Results whose job is gone are skipped.
    pub async fn get_match_results(&self, limit: i64) -> Result<Vec<StoredMatch>, AppError> {
        let Some((cv_hash, _)) = self.store.get_candidate().await? else {
            return Ok(Vec::new());
        };

        let records = self.store.get_match_results(&cv_hash, limit).await?;
        let uids: Vec<String> = records.iter().map(|r| r.job_uid.clone()).collect();
        let mut jobs = index_jobs(self.store.get_jobs_by_uids(&uids).await?);

        let mut stale = 0usize;
        let matches: Vec<StoredMatch> = records
            .into_iter()
            .filter_map(|record| match jobs.remove(&record.job_uid) {
                Some(job) => Some(StoredMatch {
                    view_count: record.view_count,
                    first_shown_at: record.first_shown_at,
                    last_shown_at: record.last_shown_at,
                    result: record.hydrate(job),
                }),
                None => {
                    stale += 1;
                    None
                }
            })
            .collect();
        if stale > 0 {
            debug!(stale, "Skipped stored results whose job no longer exists");
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::candidate::Seniority;
    use crate::models::match_result::CachedMatch;
    use crate::store::MemoryMatchStore;
    use crate::testing::{make_candidate, make_job, FakeEmbedder, FakeExplainer, FakeProfileParser};

    fn pipeline(store: Arc<MemoryMatchStore>, embedder: Arc<FakeEmbedder>) -> MatchPipeline {
        MatchPipeline::new(
            store,
            embedder,
            Arc::new(FakeExplainer::default()),
            MatchSettings::default(),
        )
    }

    fn candidate() -> CandidateProfile {
        make_candidate(&["python", "sql"], &["django"], Seniority::Senior)
    }

    #[tokio::test]
    async fn test_get_or_parse_reuses_profile_for_same_text() {
        let store = MemoryMatchStore::new();
        let parser = FakeProfileParser::new(candidate());

        let first = get_or_parse_candidate(&store, &parser, "my cv").await.unwrap();
        let second = get_or_parse_candidate(&store, &parser, "my cv").await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.cv_hash, second.cv_hash);
        assert_eq!(parser.call_count(), 1);
        assert_eq!(second.profile.raw_text, "my cv");
    }

    #[tokio::test]
    async fn test_new_cv_replaces_current_candidate() {
        let store = MemoryMatchStore::new();
        let parser = FakeProfileParser::new(candidate());

        get_or_parse_candidate(&store, &parser, "old cv").await.unwrap();
        let fresh = get_or_parse_candidate(&store, &parser, "new cv").await.unwrap();

        assert_eq!(parser.call_count(), 2);
        let (hash, _) = store.get_candidate().await.unwrap().unwrap();
        assert_eq!(hash, fresh.cv_hash);
    }

    #[tokio::test]
    async fn test_get_or_parse_rejects_blank_text() {
        let store = MemoryMatchStore::new();
        let parser = FakeProfileParser::new(candidate());
        let err = get_or_parse_candidate(&store, &parser, "  \n").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(parser.call_count(), 0);
    }

    #[tokio::test]
    async fn test_embed_missing_jobs_only_touches_pending() {
        let store = MemoryMatchStore::new();
        let embedder = FakeEmbedder::default();
        store
            .upsert_jobs(&[make_job("a", "A", "rust"), make_job("b", "B", "")])
            .await
            .unwrap();

        assert_eq!(embed_missing_jobs(&store, &embedder).await.unwrap(), 2);
        assert!(store.get_unembedded_jobs().await.unwrap().is_empty());

        assert_eq!(embed_missing_jobs(&store, &embedder).await.unwrap(), 0);
        assert_eq!(embedder.call_count(), 1);
    }

    fn numbered_jobs(count: usize) -> Vec<Job> {
        (0..count)
            .map(|i| make_job(&format!("job-{i:03}"), "Engineer", "rust"))
            .collect()
    }

    #[tokio::test]
    async fn test_embed_missing_jobs_splits_large_backlog() {
        let store = MemoryMatchStore::new();
        let embedder = FakeEmbedder::with_max_batch(EMBED_BATCH_SIZE);
        store.upsert_jobs(&numbered_jobs(250)).await.unwrap();

        assert_eq!(embed_missing_jobs(&store, &embedder).await.unwrap(), 250);
        assert_eq!(embedder.call_count(), 3);
        assert!(store.get_unembedded_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_missing_jobs_retries_after_rejected_batch() {
        let store = MemoryMatchStore::new();
        // Accepts nothing larger than half a chunk, so the first request fails.
        let strict = FakeEmbedder::with_max_batch(EMBED_BATCH_SIZE / 2);
        store.upsert_jobs(&numbered_jobs(EMBED_BATCH_SIZE + 10)).await.unwrap();

        let err = embed_missing_jobs(&store, &strict).await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
        assert_eq!(
            store.get_unembedded_jobs().await.unwrap().len(),
            EMBED_BATCH_SIZE + 10
        );

        // A provider that takes full chunks drains the backlog.
        let embedder = FakeEmbedder::with_max_batch(EMBED_BATCH_SIZE);
        assert_eq!(
            embed_missing_jobs(&store, &embedder).await.unwrap(),
            EMBED_BATCH_SIZE + 10
        );
        assert!(store.get_unembedded_jobs().await.unwrap().is_empty());
    }

    #[test]
    fn test_job_embedding_text_falls_back_to_title() {
        assert_eq!(job_embedding_text(&make_job("a", "Rust Engineer", "")), "Rust Engineer");
        let text = job_embedding_text(&make_job("a", "Rust Engineer", "Build services"));
        assert!(text.starts_with("Rust Engineer\n\n"));
        assert!(text.contains("Build services"));
    }

    #[tokio::test]
    async fn test_ingest_survives_embedding_outage() {
        let store = MemoryMatchStore::new();
        let embedder = FakeEmbedder::failing();

        let stats = ingest_jobs(&store, &embedder, &[make_job("a", "A", "rust")])
            .await
            .unwrap();

        assert_eq!(
            stats,
            IngestStats {
                jobs_upserted: 1,
                jobs_embedded: 0
            }
        );
        assert_eq!(store.get_unembedded_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_rejects_blank_uid() {
        let store = MemoryMatchStore::new();
        let err = ingest_jobs(&store, &FakeEmbedder::default(), &[make_job(" ", "A", "")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_run_without_candidate_is_empty() {
        let store = Arc::new(MemoryMatchStore::new());
        store.upsert_jobs(&[make_job("a", "Python Developer", "Python")]).await.unwrap();

        let run = pipeline(store, Arc::new(FakeEmbedder::default()))
            .run_scheduled_matching(&RunOptions::default())
            .await
            .unwrap();

        assert!(!run.stats.candidate_found);
        assert!(run.matches.is_empty());
    }

    #[tokio::test]
    async fn test_run_matches_backfills_and_persists() {
        let store = Arc::new(MemoryMatchStore::new());
        store.save_candidate("h", &candidate()).await.unwrap();
        store
            .upsert_jobs(&[
                make_job("a", "Python Developer", "Python and SQL"),
                make_job("b", "Designer", "Figma"),
            ])
            .await
            .unwrap();

        let run = pipeline(store.clone(), Arc::new(FakeEmbedder::default()))
            .run_scheduled_matching(&RunOptions::default())
            .await
            .unwrap();

        assert!(run.stats.candidate_found);
        assert_eq!(run.stats.jobs_considered, 2);
        assert_eq!(run.stats.matches_generated, 1);
        assert_eq!(run.stats.results_saved, 1);
        assert_eq!(run.matches[0].job.uid, "a");
        assert!(run.matches[0].similarity_score > 0.0);
        assert!(store.get_unembedded_jobs().await.unwrap().is_empty());
        assert_eq!(store.cached("h", "a").await.unwrap().view_count, 1);
    }

    #[tokio::test]
    async fn test_run_location_keeps_matching_and_remote_jobs() {
        let store = Arc::new(MemoryMatchStore::new());
        store.save_candidate("h", &candidate()).await.unwrap();
        let mut berlin = make_job("berlin", "Python Developer", "Python");
        berlin.location = Some("Berlin, Germany".to_string());
        let mut paris = make_job("paris", "Python Developer", "Python");
        paris.location = Some("Paris".to_string());
        let mut remote = make_job("remote", "Python Developer", "Python");
        remote.workplace_type = Some("Remote".to_string());
        store.upsert_jobs(&[berlin, paris, remote]).await.unwrap();

        let options = RunOptions {
            location: Some("berlin".to_string()),
            ..RunOptions::default()
        };
        let run = pipeline(store, Arc::new(FakeEmbedder::default()))
            .run_scheduled_matching(&options)
            .await
            .unwrap();

        let mut uids: Vec<&str> = run.matches.iter().map(|m| m.job.uid.as_str()).collect();
        uids.sort_unstable();
        assert_eq!(uids, vec!["berlin", "remote"]);
    }

    #[tokio::test]
    async fn test_run_rejects_zero_top_n() {
        let store = Arc::new(MemoryMatchStore::new());
        let options = RunOptions {
            top_n: Some(0),
            ..RunOptions::default()
        };
        let err = pipeline(store, Arc::new(FakeEmbedder::default()))
            .run_scheduled_matching(&options)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_stored_results_hydrated_and_stale_skipped() {
        let store = Arc::new(MemoryMatchStore::new());
        store.save_candidate("h", &candidate()).await.unwrap();
        store.upsert_jobs(&[make_job("live", "Engineer", "Python")]).await.unwrap();
        let shown_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        for (uid, score) in [("live", 0.8), ("gone", 0.9)] {
            store
                .insert_cached(
                    "h",
                    CachedMatch {
                        job_uid: uid.to_string(),
                        similarity_score: score,
                        filter_score: score,
                        final_score: score,
                        explanation: vec!["fits".to_string()],
                        missing_skills: vec![],
                        interview_tips: vec![],
                        view_count: 2,
                        first_shown_at: shown_at,
                        last_shown_at: shown_at,
                    },
                )
                .await;
        }

        let stored = pipeline(store, Arc::new(FakeEmbedder::default()))
            .get_match_results(10)
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].result.job.uid, "live");
        assert_eq!(stored[0].view_count, 2);
        assert_eq!(stored[0].last_shown_at, shown_at);
        assert_eq!(
            stored[0].result.apply_url.as_deref(),
            Some("https://jobs.example.com/live")
        );
    }
}
