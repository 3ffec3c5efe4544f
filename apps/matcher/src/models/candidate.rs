use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use sqlx::FromRow;

/// Seniority levels in ascending order. The discriminant is the ordinal used
/// for band comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior = 0,
    Mid = 1,
    Senior = 2,
    Lead = 3,
    Principal = 4,
    Staff = 5,
}

impl Seniority {
    pub const ALL: [Seniority; 6] = [
        Seniority::Junior,
        Seniority::Mid,
        Seniority::Senior,
        Seniority::Lead,
        Seniority::Principal,
        Seniority::Staff,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Seniority::Junior => "junior",
            Seniority::Mid => "mid",
            Seniority::Senior => "senior",
            Seniority::Lead => "lead",
            Seniority::Principal => "principal",
            Seniority::Staff => "staff",
        }
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Seniority {
    type Err = String;

    /// Case-insensitive lookup, used on LLM output.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == needle)
            .ok_or_else(|| format!("unknown seniority level '{s}'"))
    }
}

/// Structured representation of a candidate's CV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub skills: Vec<String>,
    pub tools_frameworks: Vec<String>,
    pub seniority: Seniority,
    #[serde(default)]
    pub years_experience: Option<u32>,
    pub domains: Vec<String>,
    pub keywords: Vec<String>,
    /// Original extracted text. Stored in its own column, not in the profile JSON.
    #[serde(default, skip_serializing)]
    pub raw_text: String,
}

impl CandidateProfile {
    /// Text fed to the embedding provider for this candidate.
    pub fn embedding_text(&self) -> String {
        [
            self.skills.join(" "),
            self.tools_frameworks.join(" "),
            self.domains.join(" "),
            self.keywords.join(" "),
        ]
        .join(" ")
    }
}

/// SHA-256 of the raw CV text, hex encoded. Identity of a candidate.
pub fn compute_cv_hash(cv_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cv_text.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Short form of a CV hash for logs and API responses.
pub fn short_hash(cv_hash: &str) -> &str {
    &cv_hash[..cv_hash.len().min(16)]
}

#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub cv_hash: String,
    pub profile_json: Json<CandidateProfile>,
    pub raw_text: String,
}

impl CandidateRow {
    pub fn into_profile(self) -> (String, CandidateProfile) {
        let mut profile = self.profile_json.0;
        profile.raw_text = self.raw_text;
        (self.cv_hash, profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seniority_parses_case_insensitively() {
        assert_eq!("Senior".parse::<Seniority>().unwrap(), Seniority::Senior);
        assert_eq!(" STAFF ".parse::<Seniority>().unwrap(), Seniority::Staff);
        assert!("intern".parse::<Seniority>().is_err());
    }

    #[test]
    fn test_seniority_ordering_follows_ordinals() {
        assert!(Seniority::Junior < Seniority::Mid);
        assert!(Seniority::Principal < Seniority::Staff);
        assert_eq!(Seniority::Lead.ordinal(), 3);
    }

    #[test]
    fn test_seniority_serde_lowercase() {
        let json = serde_json::to_string(&Seniority::Principal).unwrap();
        assert_eq!(json, r#""principal""#);
        let parsed: Seniority = serde_json::from_str(r#""mid""#).unwrap();
        assert_eq!(parsed, Seniority::Mid);
    }

    #[test]
    fn test_cv_hash_is_stable_sha256_hex() {
        let hash = compute_cv_hash("hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(hash, compute_cv_hash("hello"));
        assert_ne!(hash, compute_cv_hash("hello "));
    }

    #[test]
    fn test_short_hash_truncates_to_sixteen() {
        let hash = compute_cv_hash("cv");
        assert_eq!(short_hash(&hash).len(), 16);
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn test_profile_json_omits_raw_text() {
        let profile = CandidateProfile {
            skills: vec!["python".to_string()],
            tools_frameworks: vec![],
            seniority: Seniority::Mid,
            years_experience: Some(4),
            domains: vec![],
            keywords: vec![],
            raw_text: "secret cv body".to_string(),
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("secret cv body"));

        let back: CandidateProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.raw_text, "");
        assert_eq!(back.years_experience, Some(4));
    }

    #[test]
    fn test_embedding_text_joins_all_term_lists() {
        let profile = CandidateProfile {
            skills: vec!["python".to_string()],
            tools_frameworks: vec!["django".to_string()],
            seniority: Seniority::Senior,
            years_experience: None,
            domains: vec!["fintech".to_string()],
            keywords: vec!["apis".to_string()],
            raw_text: String::new(),
        };
        assert_eq!(profile.embedding_text(), "python django fintech apis");
    }
}
