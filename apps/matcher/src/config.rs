use anyhow::{bail, Context, Result};

const DEFAULT_EMBEDDING_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing, before any LLM or
/// embedding call can be made.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means the process-local in-memory store.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub embedding: EmbeddingConfig,
    pub matching: MatchSettings,
    pub port: u16,
    pub rust_log: String,
}

/// OpenAI-compatible embedding endpoint.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_base: String,
    /// Empty for local providers that take no credentials.
    pub api_key: String,
    pub model: String,
    pub dimensions: Option<u32>,
    pub timeout_ms: u64,
}

/// Tunables of one matching run.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    /// Weight of embedding similarity. The filter weight is `1 - similarity_weight`.
    pub similarity_weight: f64,
    /// Minimum fuzzy score (0-100) for a skill to count as matched.
    pub skill_threshold: u8,
    /// A job surfaced this many times is no longer offered. 0 disables the limit.
    pub max_job_views: i32,
    pub top_n: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            similarity_weight: 0.6,
            skill_threshold: 80,
            max_job_views: 3,
            top_n: 5,
        }
    }
}

impl MatchSettings {
    pub fn filter_weight(&self) -> f64 {
        1.0 - self.similarity_weight
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_weight) {
            bail!(
                "SIMILARITY_WEIGHT must be within [0, 1], got {}",
                self.similarity_weight
            );
        }
        if self.skill_threshold > 100 {
            bail!(
                "SKILL_MATCH_THRESHOLD must be within [0, 100], got {}",
                self.skill_threshold
            );
        }
        if self.top_n == 0 {
            bail!("DEFAULT_TOP_N must be at least 1");
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = MatchSettings::default();
        let matching = MatchSettings {
            similarity_weight: parse_env("SIMILARITY_WEIGHT", defaults.similarity_weight)?,
            skill_threshold: parse_env("SKILL_MATCH_THRESHOLD", defaults.skill_threshold)?,
            max_job_views: parse_env("MAX_JOB_VIEWS", defaults.max_job_views)?,
            top_n: parse_env("DEFAULT_TOP_N", defaults.top_n)?,
        };
        matching.validate()?;

        let anthropic_api_key = require_env("ANTHROPIC_API_KEY")?;
        if anthropic_api_key.trim().is_empty() {
            bail!("ANTHROPIC_API_KEY is set but empty");
        }

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key,
            embedding: EmbeddingConfig {
                api_base: optional_env("EMBEDDING_API_BASE")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_API_BASE.to_string()),
                api_key: optional_env("EMBEDDING_API_KEY").unwrap_or_default(),
                model: optional_env("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                dimensions: optional_env("EMBEDDING_DIMENSIONS")
                    .map(|v| v.parse::<u32>())
                    .transpose()
                    .context("EMBEDDING_DIMENSIONS must be a positive integer")?,
                timeout_ms: parse_env("EMBEDDING_TIMEOUT_MS", 30_000)?,
            },
            matching,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
