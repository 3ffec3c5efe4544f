use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::candidate::{CandidateProfile, CandidateRow};
use crate::models::job::{Job, JobRow};
use crate::models::match_result::{CachedMatch, MatchResult, MatchResultRow};
use crate::store::MatchStore;

/// Idempotent DDL run at startup. `match_results` has no foreign keys: the
/// exposure history outlives both the candidate and the job.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        uid                     TEXT PRIMARY KEY,
        name                    TEXT NOT NULL,
        department              TEXT,
        company_name            TEXT,
        employment_type         TEXT,
        experience_level        TEXT,
        location                TEXT,
        workplace_type          TEXT,
        position_url            TEXT,
        url_active_page         TEXT,
        url_comeet_hosted_page  TEXT,
        url_recruit_hosted_page TEXT,
        url_detected_page       TEXT,
        details                 JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at              TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_embeddings (
        job_uid     TEXT PRIMARY KEY REFERENCES jobs(uid) ON DELETE CASCADE,
        embedding   REAL[] NOT NULL,
        embedded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidates (
        cv_hash      TEXT PRIMARY KEY,
        profile_json JSONB NOT NULL,
        raw_text     TEXT NOT NULL,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_used_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS match_results (
        id               BIGSERIAL PRIMARY KEY,
        cv_hash          TEXT NOT NULL,
        job_uid          TEXT NOT NULL,
        similarity_score DOUBLE PRECISION NOT NULL,
        filter_score     DOUBLE PRECISION NOT NULL,
        final_score      DOUBLE PRECISION NOT NULL,
        explanation      JSONB NOT NULL DEFAULT '[]'::jsonb,
        missing_skills   TEXT[] NOT NULL DEFAULT '{}',
        interview_tips   TEXT[] NOT NULL DEFAULT '{}',
        view_count       INTEGER NOT NULL DEFAULT 1,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (cv_hash, job_uid)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_match_results_cv_hash ON match_results (cv_hash)",
];

#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn get_jobs(&self, location: Option<&str>) -> Result<Vec<Job>, AppError> {
        let location = location.map(str::trim).filter(|l| !l.is_empty());
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE $1::TEXT IS NULL
               OR location ILIKE '%' || $1 || '%'
               OR location ILIKE '%remote%'
               OR workplace_type ILIKE '%remote%'
            ORDER BY uid
            "#,
        )
        .bind(location)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Job::from).collect())
    }

    async fn get_jobs_by_uids(&self, uids: &[String]) -> Result<Vec<Job>, AppError> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE uid = ANY($1)")
            .bind(uids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_uid: HashMap<String, Job> = rows
            .into_iter()
            .map(|row| (row.uid.clone(), Job::from(row)))
            .collect();
        Ok(uids.iter().filter_map(|uid| by_uid.remove(uid)).collect())
    }

    async fn upsert_jobs(&self, jobs: &[Job]) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;
        for job in jobs {
            sqlx::query(
                r#"
                INSERT INTO jobs
                    (uid, name, department, company_name, employment_type, experience_level,
                     location, workplace_type, position_url, url_active_page,
                     url_comeet_hosted_page, url_recruit_hosted_page, url_detected_page, details)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                ON CONFLICT (uid) DO UPDATE SET
                    name = EXCLUDED.name,
                    department = EXCLUDED.department,
                    company_name = EXCLUDED.company_name,
                    employment_type = EXCLUDED.employment_type,
                    experience_level = EXCLUDED.experience_level,
                    location = EXCLUDED.location,
                    workplace_type = EXCLUDED.workplace_type,
                    position_url = EXCLUDED.position_url,
                    url_active_page = EXCLUDED.url_active_page,
                    url_comeet_hosted_page = EXCLUDED.url_comeet_hosted_page,
                    url_recruit_hosted_page = EXCLUDED.url_recruit_hosted_page,
                    url_detected_page = EXCLUDED.url_detected_page,
                    details = EXCLUDED.details,
                    updated_at = NOW()
                "#,
            )
            .bind(&job.uid)
            .bind(&job.name)
            .bind(&job.department)
            .bind(&job.company_name)
            .bind(&job.employment_type)
            .bind(&job.experience_level)
            .bind(&job.location)
            .bind(&job.workplace_type)
            .bind(&job.position_url)
            .bind(&job.url_active_page)
            .bind(&job.url_comeet_hosted_page)
            .bind(&job.url_recruit_hosted_page)
            .bind(&job.url_detected_page)
            .bind(Json(&job.details))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(jobs.len())
    }

    async fn get_job_embeddings(
        &self,
        uids: &[String],
    ) -> Result<HashMap<String, Vec<f32>>, AppError> {
        if uids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (String, Vec<f32>)>(
            "SELECT job_uid, embedding FROM job_embeddings WHERE job_uid = ANY($1)",
        )
        .bind(uids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn store_job_embeddings(
        &self,
        embeddings: &[(String, Vec<f32>)],
    ) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;
        for (uid, vector) in embeddings {
            sqlx::query(
                r#"
                INSERT INTO job_embeddings (job_uid, embedding)
                VALUES ($1, $2)
                ON CONFLICT (job_uid) DO UPDATE SET
                    embedding = EXCLUDED.embedding,
                    embedded_at = NOW()
                "#,
            )
            .bind(uid)
            .bind(vector)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(embeddings.len())
    }

    async fn get_unembedded_jobs(&self) -> Result<Vec<Job>, AppError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT j.* FROM jobs j
            LEFT JOIN job_embeddings e ON e.job_uid = j.uid
            WHERE e.job_uid IS NULL
            ORDER BY j.uid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Job::from).collect())
    }

    async fn get_candidate(&self) -> Result<Option<(String, CandidateProfile)>, AppError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates ORDER BY last_used_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CandidateRow::into_profile))
    }

    async fn get_candidate_by_hash(
        &self,
        cv_hash: &str,
    ) -> Result<Option<CandidateProfile>, AppError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            "UPDATE candidates SET last_used_at = NOW() WHERE cv_hash = $1 RETURNING *",
        )
        .bind(cv_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| row.into_profile().1))
    }

    async fn save_candidate(
        &self,
        cv_hash: &str,
        profile: &CandidateProfile,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        // Only one CV is kept at a time.
        sqlx::query("DELETE FROM candidates")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO candidates (cv_hash, profile_json, raw_text, created_at, last_used_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            "#,
        )
        .bind(cv_hash)
        .bind(Json(profile))
        .bind(&profile.raw_text)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_cached_uids(&self, cv_hash: &str) -> Result<HashSet<String>, AppError> {
        let uids: Vec<String> =
            sqlx::query_scalar("SELECT job_uid FROM match_results WHERE cv_hash = $1")
                .bind(cv_hash)
                .fetch_all(&self.pool)
                .await?;
        Ok(uids.into_iter().collect())
    }

    async fn get_eligible_cached(
        &self,
        cv_hash: &str,
        max_views: i32,
    ) -> Result<HashMap<String, CachedMatch>, AppError> {
        let rows = sqlx::query_as::<_, MatchResultRow>(
            r#"
            SELECT * FROM match_results
            WHERE cv_hash = $1 AND ($2 <= 0 OR view_count < $2)
            "#,
        )
        .bind(cv_hash)
        .bind(max_views)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.job_uid.clone(), CachedMatch::from(row)))
            .collect())
    }

    async fn get_excluded_uids(
        &self,
        cv_hash: &str,
        max_views: i32,
    ) -> Result<HashSet<String>, AppError> {
        if max_views <= 0 {
            return Ok(HashSet::new());
        }
        let uids: Vec<String> = sqlx::query_scalar(
            "SELECT job_uid FROM match_results WHERE cv_hash = $1 AND view_count >= $2",
        )
        .bind(cv_hash)
        .bind(max_views)
        .fetch_all(&self.pool)
        .await?;
        Ok(uids.into_iter().collect())
    }

    async fn upsert_cached_results(
        &self,
        cv_hash: &str,
        results: &[MatchResult],
    ) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut touched = 0;
        for result in results {
            // Scores and texts of an existing pair are authoritative; only
            // the exposure counter moves.
            let outcome = sqlx::query(
                r#"
                INSERT INTO match_results
                    (cv_hash, job_uid, similarity_score, filter_score, final_score,
                     explanation, missing_skills, interview_tips, view_count)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
                ON CONFLICT (cv_hash, job_uid) DO UPDATE SET
                    view_count = match_results.view_count + 1,
                    updated_at = NOW()
                "#,
            )
            .bind(cv_hash)
            .bind(&result.job.uid)
            .bind(result.similarity_score)
            .bind(result.filter_score)
            .bind(result.final_score)
            .bind(Json(&result.explanation))
            .bind(&result.missing_skills)
            .bind(&result.interview_tips)
            .execute(&mut *tx)
            .await?;
            touched += outcome.rows_affected() as usize;
        }
        tx.commit().await?;
        debug!(touched, "Upserted cached match results");
        Ok(touched)
    }

    async fn get_match_results(
        &self,
        cv_hash: &str,
        limit: i64,
    ) -> Result<Vec<CachedMatch>, AppError> {
        let rows = sqlx::query_as::<_, MatchResultRow>(
            r#"
            SELECT * FROM match_results
            WHERE cv_hash = $1
            ORDER BY final_score DESC, job_uid
            LIMIT $2
            "#,
        )
        .bind(cv_hash)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CachedMatch::from).collect())
    }
}
