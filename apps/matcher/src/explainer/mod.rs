//! Natural-language side of a match: explanation bullets, missing skills and
//! interview tips.
//!
//! `Explainer` is the LLM seam, carried in `AppState` as `Arc<dyn Explainer>`.
//! Missing skills are found deterministically first and only the non-empty
//! list is handed to the model for refinement.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::AppError;
use crate::llm_client::prompts::{fill, join_or};
use crate::llm_client::LlmClient;
use crate::matching::fuzzy::ratio;
use crate::matching::text::{extract_details_text, extract_job_keywords};
use crate::models::candidate::CandidateProfile;
use crate::models::job::Job;
use crate::models::match_result::MatchResult;

pub mod prompts;

const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_BULLETS: usize = 3;
const MAX_REFINED_SKILLS: usize = 7;
const MAX_TIPS: usize = 2;

#[async_trait]
pub trait Explainer: Send + Sync {
    /// 2-3 bullet points. Fails when the model returns nothing usable.
    async fn generate_explanation(
        &self,
        job: &Job,
        candidate: &CandidateProfile,
        similarity_score: f64,
        filter_score: f64,
    ) -> Result<Vec<String>, AppError>;

    /// Cleans up keyword-extracted gaps. Returns (refined skills, tips).
    async fn refine_missing_skills(
        &self,
        candidate: &CandidateProfile,
        job: &Job,
        raw_missing: &[String],
    ) -> Result<(Vec<String>, Vec<String>), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmExplainer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExplanationOutput {
    bullet_points: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RefinedSkillsOutput {
    #[serde(default)]
    refined_skills: Vec<String>,
    #[serde(default)]
    interview_tips: Vec<String>,
}

pub struct LlmExplainer {
    llm: LlmClient,
}

impl LlmExplainer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Explainer for LlmExplainer {
    async fn generate_explanation(
        &self,
        job: &Job,
        candidate: &CandidateProfile,
        similarity_score: f64,
        filter_score: f64,
    ) -> Result<Vec<String>, AppError> {
        let prompt = build_explanation_prompt(job, candidate, similarity_score, filter_score);
        let output: ExplanationOutput = self
            .llm
            .call_json(&prompt, prompts::EXPLANATION_SYSTEM)
            .await?;

        let bullets = clean_list(output.bullet_points, MAX_BULLETS);
        if bullets.is_empty() {
            return Err(AppError::Llm(format!(
                "empty explanation for job {}",
                job.uid
            )));
        }
        Ok(bullets)
    }

    async fn refine_missing_skills(
        &self,
        candidate: &CandidateProfile,
        job: &Job,
        raw_missing: &[String],
    ) -> Result<(Vec<String>, Vec<String>), AppError> {
        if raw_missing.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let prompt = build_refine_prompt(candidate, job, raw_missing);
        let output: RefinedSkillsOutput = self
            .llm
            .call_json(&prompt, prompts::REFINE_SYSTEM)
            .await?;

        Ok((
            clean_list(output.refined_skills, MAX_REFINED_SKILLS),
            clean_list(output.interview_tips, MAX_TIPS),
        ))
    }
}

fn build_explanation_prompt(
    job: &Job,
    candidate: &CandidateProfile,
    similarity_score: f64,
    filter_score: f64,
) -> String {
    let years = candidate
        .years_experience
        .map_or_else(|| "Unknown".to_string(), |y| y.to_string());
    fill(
        prompts::EXPLANATION_PROMPT_TEMPLATE,
        &[
            ("candidate_skills", join_or(&candidate.skills, "None listed").as_str()),
            ("candidate_tools", join_or(&candidate.tools_frameworks, "None listed").as_str()),
            ("candidate_domains", join_or(&candidate.domains, "None listed").as_str()),
            ("years_experience", years.as_str()),
            ("job_title", job.name.as_str()),
            ("company_name", job.company_name.as_deref().unwrap_or("Unknown")),
            ("job_location", job.location.as_deref().unwrap_or("Not specified")),
            ("job_description", truncated_description(job).as_str()),
            ("similarity_score", as_percent(similarity_score).as_str()),
            ("filter_score", as_percent(filter_score).as_str()),
        ],
    )
}

fn build_refine_prompt(candidate: &CandidateProfile, job: &Job, raw_missing: &[String]) -> String {
    fill(
        prompts::REFINE_PROMPT_TEMPLATE,
        &[
            ("candidate_skills", join_or(&candidate.skills, "None listed").as_str()),
            ("candidate_tools", join_or(&candidate.tools_frameworks, "None listed").as_str()),
            ("candidate_domains", join_or(&candidate.domains, "None listed").as_str()),
            ("candidate_seniority", candidate.seniority.as_str()),
            ("job_title", job.name.as_str()),
            ("company_name", job.company_name.as_deref().unwrap_or("Unknown")),
            ("raw_missing_skills", raw_missing.join(", ").as_str()),
        ],
    )
}

/// Job description capped at `MAX_DESCRIPTION_CHARS` characters.
fn truncated_description(job: &Job) -> String {
    let text = extract_details_text(&job.details);
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_DESCRIPTION_CHARS).collect();
    cut.push_str("...");
    cut
}

fn as_percent(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}

fn clean_list(items: Vec<String>, max: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(max)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic gap finding
// ────────────────────────────────────────────────────────────────────────────

/// Job keywords that no candidate skill, tool or domain matches at
/// `threshold` or above, in the order they appear in the posting.
pub fn find_missing_skills(job: &Job, candidate: &CandidateProfile, threshold: u8) -> Vec<String> {
    let keywords = extract_job_keywords(job);
    if keywords.is_empty() {
        return Vec::new();
    }

    let candidate_terms: BTreeSet<String> = candidate
        .skills
        .iter()
        .chain(&candidate.tools_frameworks)
        .chain(&candidate.domains)
        .map(|term| term.to_lowercase())
        .collect();

    let threshold = f64::from(threshold);
    keywords
        .into_iter()
        .filter(|keyword| {
            !candidate_terms
                .iter()
                .any(|term| ratio(keyword, term) >= threshold)
        })
        .collect()
}

/// Fills explanation, missing skills and interview tips of a freshly ranked
/// result. Any collaborator failure fails the whole result.
pub async fn explain_match(
    explainer: &dyn Explainer,
    mut result: MatchResult,
    candidate: &CandidateProfile,
    skill_threshold: u8,
) -> Result<MatchResult, AppError> {
    result.explanation = explainer
        .generate_explanation(
            &result.job,
            candidate,
            result.similarity_score,
            result.filter_score,
        )
        .await?;

    let raw_missing = find_missing_skills(&result.job, candidate, skill_threshold);
    if !raw_missing.is_empty() {
        let (refined, tips) = explainer
            .refine_missing_skills(candidate, &result.job, &raw_missing)
            .await?;
        result.missing_skills = refined;
        result.interview_tips = tips;
    }

    Ok(result)
}
