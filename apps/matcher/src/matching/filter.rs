//! Deterministic job elimination. Runs view-count, location, seniority and
//! skill filters in that order; only the skill filter produces a score.

use std::collections::{BTreeSet, HashSet};

use crate::matching::fuzzy::partial_ratio;
use crate::matching::text::skill_haystack;
use crate::models::candidate::{CandidateProfile, Seniority};
use crate::models::job::Job;

/// A job that survived every filter, with its skill score (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredJob {
    pub job: Job,
    pub skill_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOptions<'a> {
    pub location: Option<&'a str>,
    pub skill_threshold: u8,
    /// Uids already shown `max_views` times. `None` skips the view filter.
    pub excluded_uids: Option<&'a HashSet<String>>,
    pub max_views: i32,
}

/// Drops jobs whose uid is in `excluded`. Disabled when `max_views <= 0` or
/// when no exclusion set is known for the candidate.
pub fn filter_by_view_count(
    jobs: Vec<Job>,
    excluded: Option<&HashSet<String>>,
    max_views: i32,
) -> Vec<Job> {
    match excluded {
        Some(excluded) if max_views > 0 && !excluded.is_empty() => jobs
            .into_iter()
            .filter(|job| !excluded.contains(&job.uid))
            .collect(),
        _ => jobs,
    }
}

/// Keeps remote jobs and jobs whose location contains `location`
/// (case-insensitive). No location means no filtering.
pub fn filter_by_location(jobs: Vec<Job>, location: Option<&str>) -> Vec<Job> {
    let Some(location) = location.filter(|l| !l.trim().is_empty()) else {
        return jobs;
    };
    let wanted = location.to_lowercase();

    jobs.into_iter()
        .filter(|job| {
            let job_location = job.location.as_deref().unwrap_or("").to_lowercase();
            let workplace = job.workplace_type.as_deref().unwrap_or("").to_lowercase();

            if job_location.contains("remote") || workplace.contains("remote") {
                true
            } else if job_location.contains(&wanted) {
                true
            } else {
                // Hybrid roles need the location to match too, which the
                // branch above already covers.
                workplace.contains("hybrid") && job_location.contains(&wanted)
            }
        })
        .collect()
}

/// First seniority name (in ascending order) found in `text`.
pub fn extract_seniority_from_text(text: &str) -> Option<Seniority> {
    let text = text.to_lowercase();
    Seniority::ALL
        .into_iter()
        .find(|level| text.contains(level.as_str()))
}

/// Accepts jobs with no detectable level or a level within one step of the
/// candidate's.
pub fn filter_by_seniority(jobs: Vec<Job>, candidate: &CandidateProfile) -> Vec<Job> {
    let ordinal = candidate.seniority.ordinal();
    let min = ordinal.saturating_sub(1);
    let max = (ordinal + 1).min(Seniority::Staff.ordinal());

    jobs.into_iter()
        .filter(|job| {
            let text = format!(
                "{} {}",
                job.name,
                job.experience_level.as_deref().unwrap_or("")
            );
            match extract_seniority_from_text(&text) {
                None => true,
                Some(level) => (min..=max).contains(&level.ordinal()),
            }
        })
        .collect()
}

/// Distinct lowercase skill and tool terms of the candidate.
pub fn candidate_terms(candidate: &CandidateProfile) -> BTreeSet<String> {
    candidate
        .skills
        .iter()
        .chain(candidate.tools_frameworks.iter())
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Keeps jobs matching at least one candidate term at `threshold` or above.
/// The score is the sum of matching term scores over the number of terms.
/// A candidate without skills or tools passes every job with score 0.
pub fn filter_by_skills(
    jobs: Vec<Job>,
    candidate: &CandidateProfile,
    threshold: u8,
) -> Vec<FilteredJob> {
    let terms = candidate_terms(candidate);
    if terms.is_empty() {
        return jobs
            .into_iter()
            .map(|job| FilteredJob {
                job,
                skill_score: 0.0,
            })
            .collect();
    }

    let threshold = f64::from(threshold);
    jobs.into_iter()
        .filter_map(|job| {
            let haystack = skill_haystack(&job);
            let matched: Vec<f64> = terms
                .iter()
                .map(|term| partial_ratio(term, &haystack))
                .filter(|score| *score >= threshold)
                .collect();

            if matched.is_empty() {
                return None;
            }
            let skill_score = matched.iter().sum::<f64>() / terms.len() as f64;
            Some(FilteredJob { job, skill_score })
        })
        .collect()
}

/// Runs every filter in order and returns the survivors with their scores.
pub fn apply_filters(
    jobs: Vec<Job>,
    candidate: &CandidateProfile,
    options: &FilterOptions<'_>,
) -> Vec<FilteredJob> {
    let total = jobs.len();
    let jobs = filter_by_view_count(jobs, options.excluded_uids, options.max_views);
    let after_views = jobs.len();
    let jobs = filter_by_location(jobs, options.location);
    let after_location = jobs.len();
    let jobs = filter_by_seniority(jobs, candidate);
    let after_seniority = jobs.len();
    let results = filter_by_skills(jobs, candidate, options.skill_threshold);

    tracing::debug!(
        total,
        after_views,
        after_location,
        after_seniority,
        after_skills = results.len(),
        "Applied job filters"
    );
    results
}
