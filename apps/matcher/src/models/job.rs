use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A section within a job posting (e.g. Description, Requirements).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub name: String,
    /// HTML content of the section.
    #[serde(default)]
    pub value: Option<String>,
    pub order: i32,
}

/// A job posting as consumed by the matching pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub workplace_type: Option<String>,
    #[serde(default)]
    pub position_url: Option<String>,
    #[serde(default)]
    pub url_active_page: Option<String>,
    #[serde(default)]
    pub url_comeet_hosted_page: Option<String>,
    #[serde(default)]
    pub url_recruit_hosted_page: Option<String>,
    #[serde(default)]
    pub url_detected_page: Option<String>,
    #[serde(default)]
    pub details: Vec<JobDetail>,
}

impl Job {
    /// Best available URL to apply for the position.
    pub fn apply_url(&self) -> Option<String> {
        [
            &self.position_url,
            &self.url_active_page,
            &self.url_comeet_hosted_page,
            &self.url_recruit_hosted_page,
            &self.url_detected_page,
        ]
        .into_iter()
        .flatten()
        .find(|url| !url.trim().is_empty())
        .cloned()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub uid: String,
    pub name: String,
    pub department: Option<String>,
    pub company_name: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    pub workplace_type: Option<String>,
    pub position_url: Option<String>,
    pub url_active_page: Option<String>,
    pub url_comeet_hosted_page: Option<String>,
    pub url_recruit_hosted_page: Option<String>,
    pub url_detected_page: Option<String>,
    pub details: Json<Vec<JobDetail>>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            uid: row.uid,
            name: row.name,
            department: row.department,
            company_name: row.company_name,
            employment_type: row.employment_type,
            experience_level: row.experience_level,
            location: row.location,
            workplace_type: row.workplace_type,
            position_url: row.position_url,
            url_active_page: row.url_active_page,
            url_comeet_hosted_page: row.url_comeet_hosted_page,
            url_recruit_hosted_page: row.url_recruit_hosted_page,
            url_detected_page: row.url_detected_page,
            details: row.details.0,
        }
    }
}
