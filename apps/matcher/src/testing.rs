//! Fixtures shared by the unit tests: builders and deterministic fakes for
//! the LLM and embedding collaborators.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::candidates::parser::ProfileParser;
use crate::config::{Config, EmbeddingConfig, MatchSettings};
use crate::embeddings::Embedder;
use crate::errors::AppError;
use crate::explainer::Explainer;
use crate::models::candidate::{CandidateProfile, Seniority};
use crate::models::job::{Job, JobDetail};
use crate::state::AppState;
use crate::store::MemoryMatchStore;

pub const FAKE_EMBEDDING_DIMS: usize = 32;

/// Job with a single "Description" section wrapping `details_text` in `<p>`.
pub fn make_job(uid: &str, name: &str, details_text: &str) -> Job {
    let details = if details_text.is_empty() {
        Vec::new()
    } else {
        vec![JobDetail {
            name: "Description".to_string(),
            value: Some(format!("<p>{details_text}</p>")),
            order: 0,
        }]
    };
    Job {
        uid: uid.to_string(),
        name: name.to_string(),
        department: None,
        company_name: Some("Acme".to_string()),
        employment_type: None,
        experience_level: None,
        location: None,
        workplace_type: None,
        position_url: Some(format!("https://jobs.example.com/{uid}")),
        url_active_page: None,
        url_comeet_hosted_page: None,
        url_recruit_hosted_page: None,
        url_detected_page: None,
        details,
    }
}

pub fn make_candidate(skills: &[&str], tools: &[&str], seniority: Seniority) -> CandidateProfile {
    CandidateProfile {
        skills: skills.iter().map(|s| s.to_string()).collect(),
        tools_frameworks: tools.iter().map(|s| s.to_string()).collect(),
        seniority,
        years_experience: Some(6),
        domains: vec!["fintech".to_string()],
        keywords: vec!["backend".to_string()],
        raw_text: format!("cv: {}", skills.join(", ")),
    }
}

/// Bag-of-words vector: each lowercase token bumps one hashed bucket. Texts
/// sharing words get a positive cosine, identical texts get 1.0.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; FAKE_EMBEDDING_DIMS];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        // FNV-1a, stable across runs unlike std's RandomState.
        let mut hash: u32 = 0x811c_9dc5;
        for byte in token.to_lowercase().bytes() {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
        vector[hash as usize % FAKE_EMBEDDING_DIMS] += 1.0;
    }
    vector
}

#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
    /// Batches larger than this are rejected, like a provider input cap.
    pub max_batch: Option<usize>,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_max_batch(max_batch: usize) -> Self {
        Self {
            max_batch: Some(max_batch),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Embedding("fake embedder down".to_string()));
        }
        Ok(bag_of_words(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Embedding("fake embedder down".to_string()));
        }
        if let Some(max) = self.max_batch.filter(|max| texts.len() > *max) {
            return Err(AppError::Embedding(format!(
                "batch of {} exceeds provider limit of {max}",
                texts.len()
            )));
        }
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

/// Explainer that counts calls and fails for the listed job uids.
#[derive(Default)]
pub struct FakeExplainer {
    pub explain_calls: AtomicUsize,
    pub refine_calls: AtomicUsize,
    pub fail_uids: HashSet<String>,
}

impl FakeExplainer {
    pub fn failing_for(uids: &[&str]) -> Self {
        Self {
            fail_uids: uids.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn explain_count(&self) -> usize {
        self.explain_calls.load(Ordering::SeqCst)
    }

    pub fn refine_count(&self) -> usize {
        self.refine_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Explainer for FakeExplainer {
    async fn generate_explanation(
        &self,
        job: &Job,
        _candidate: &CandidateProfile,
        similarity_score: f64,
        filter_score: f64,
    ) -> Result<Vec<String>, AppError> {
        self.explain_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uids.contains(&job.uid) {
            return Err(AppError::Llm(format!("no explanation for {}", job.uid)));
        }
        Ok(vec![
            format!("{} fits your stack", job.name),
            format!("similarity {similarity_score:.2}, skills {filter_score:.2}"),
        ])
    }

    async fn refine_missing_skills(
        &self,
        _candidate: &CandidateProfile,
        job: &Job,
        raw_missing: &[String],
    ) -> Result<(Vec<String>, Vec<String>), AppError> {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);
        if raw_missing.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        Ok((
            raw_missing.iter().take(7).cloned().collect(),
            vec![format!("Prepare examples relevant to {}", job.name)],
        ))
    }
}

/// Parser returning a fixed profile, with the CV text attached.
pub struct FakeProfileParser {
    pub profile: CandidateProfile,
    pub calls: AtomicUsize,
}

impl FakeProfileParser {
    pub fn new(profile: CandidateProfile) -> Self {
        Self {
            profile,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileParser for FakeProfileParser {
    async fn parse_profile(&self, cv_text: &str) -> Result<CandidateProfile, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut profile = self.profile.clone();
        profile.raw_text = cv_text.to_string();
        Ok(profile)
    }
}

/// App state over an in-memory store and the fakes above.
pub fn test_state(store: Arc<MemoryMatchStore>) -> AppState {
    AppState {
        store,
        embedder: Arc::new(FakeEmbedder::default()),
        explainer: Arc::new(FakeExplainer::default()),
        profile_parser: Arc::new(FakeProfileParser::new(make_candidate(
            &["python", "sql"],
            &["django"],
            Seniority::Senior,
        ))),
        config: Config {
            database_url: None,
            anthropic_api_key: "test-key".to_string(),
            embedding: EmbeddingConfig {
                api_base: "http://localhost:0".to_string(),
                api_key: String::new(),
                model: "test-embedding".to_string(),
                dimensions: None,
                timeout_ms: 1_000,
            },
            matching: MatchSettings::default(),
            port: 0,
            rust_log: "debug".to_string(),
        },
    }
}
