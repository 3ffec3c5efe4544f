use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::candidates::prompts::{CV_PARSE_PROMPT_TEMPLATE, CV_PARSE_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::fill;
use crate::llm_client::LlmClient;
use crate::models::candidate::{CandidateProfile, Seniority};

/// CV structuring seam. Carried in `AppState` as `Arc<dyn ProfileParser>`.
#[async_trait]
pub trait ProfileParser: Send + Sync {
    async fn parse_profile(&self, cv_text: &str) -> Result<CandidateProfile, AppError>;
}

/// Raw model output, before normalization.
#[derive(Debug, Deserialize)]
struct LlmCandidateOutput {
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    tools_frameworks: Vec<String>,
    seniority: String,
    #[serde(default)]
    years_experience: Option<u32>,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

pub struct LlmProfileParser {
    llm: LlmClient,
}

impl LlmProfileParser {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ProfileParser for LlmProfileParser {
    async fn parse_profile(&self, cv_text: &str) -> Result<CandidateProfile, AppError> {
        if cv_text.trim().is_empty() {
            return Err(AppError::Validation("CV text is empty".to_string()));
        }

        let prompt = fill(CV_PARSE_PROMPT_TEMPLATE, &[("cv_text", cv_text)]);
        let output: LlmCandidateOutput = self.llm.call_json(&prompt, CV_PARSE_SYSTEM).await?;
        let profile = into_profile(output, cv_text)?;

        info!(
            skills = profile.skills.len(),
            tools = profile.tools_frameworks.len(),
            seniority = %profile.seniority,
            "Parsed CV into profile"
        );
        Ok(profile)
    }
}

fn into_profile(output: LlmCandidateOutput, cv_text: &str) -> Result<CandidateProfile, AppError> {
    let seniority: Seniority = output.seniority.parse().map_err(AppError::Llm)?;

    let profile = CandidateProfile {
        skills: normalize_terms(output.skills),
        tools_frameworks: normalize_terms(output.tools_frameworks),
        seniority,
        years_experience: output.years_experience,
        domains: normalize_terms(output.domains),
        keywords: normalize_terms(output.keywords),
        raw_text: cv_text.to_string(),
    };

    if profile.skills.is_empty()
        && profile.tools_frameworks.is_empty()
        && profile.domains.is_empty()
        && profile.keywords.is_empty()
    {
        return Err(AppError::Llm(
            "model returned an empty profile".to_string(),
        ));
    }
    Ok(profile)
}

/// Lowercase, trimmed, non-empty, first occurrence kept.
fn normalize_terms(terms: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(seniority: &str, skills: &[&str]) -> LlmCandidateOutput {
        LlmCandidateOutput {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            tools_frameworks: vec!["Django".to_string()],
            seniority: seniority.to_string(),
            years_experience: Some(7),
            domains: vec![],
            keywords: vec![],
        }
    }

    #[test]
    fn test_profile_terms_lowercased_and_deduplicated() {
        let profile = into_profile(output("Senior", &["Python", " python ", "SQL"]), "cv").unwrap();
        assert_eq!(profile.skills, vec!["python".to_string(), "sql".to_string()]);
        assert_eq!(profile.tools_frameworks, vec!["django".to_string()]);
        assert_eq!(profile.seniority, Seniority::Senior);
        assert_eq!(profile.raw_text, "cv");
    }

    #[test]
    fn test_unknown_seniority_is_llm_error() {
        let err = into_profile(output("wizard", &["python"]), "cv").unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[test]
    fn test_empty_profile_rejected() {
        let mut empty = output("mid", &[]);
        empty.tools_frameworks.clear();
        assert!(into_profile(empty, "cv").is_err());
    }

    #[test]
    fn test_output_tolerates_missing_optional_lists() {
        let parsed: LlmCandidateOutput =
            serde_json::from_str(r#"{"skills": ["rust"], "seniority": "lead"}"#).unwrap();
        let profile = into_profile(parsed, "cv").unwrap();
        assert_eq!(profile.seniority, Seniority::Lead);
        assert!(profile.years_experience.is_none());
    }
}
