//! Plain-text views of job postings shared by the filter, the embedding
//! backfill and the explainer.

use std::collections::HashSet;

use crate::models::job::{Job, JobDetail};

/// Wide enough that html2text never wraps a paragraph.
const HTML_RENDER_WIDTH: usize = 10_000;

const STOPWORDS: &[&str] = &[
    "about", "above", "across", "after", "all", "also", "and", "any", "are", "based", "because",
    "been", "being", "both", "but", "can", "company", "could", "daily", "description", "each",
    "etc", "experience", "for", "from", "good", "great", "has", "have", "help", "how", "including", "into", "its",
    "join", "just", "knowledge", "least", "like", "looking", "more", "most", "must", "new", "not",
    "our", "out", "over", "plus", "preferred", "required", "requirements", "responsibilities",
    "role", "should", "skills", "strong", "such", "team", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "through", "using", "very", "was", "well", "were",
    "what", "when", "where", "which", "while", "who", "will", "with", "within", "work", "working",
    "would", "year", "years", "you", "your",
];

/// Removes HTML markup and returns the text content.
pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    html2text::from_read(html.as_bytes(), HTML_RENDER_WIDTH)
        .trim()
        .to_string()
}

/// Concatenates the detail sections in display order as `"Name: text"`
/// paragraphs, skipping empty sections.
pub fn extract_details_text(details: &[JobDetail]) -> String {
    let mut sorted: Vec<&JobDetail> = details.iter().collect();
    sorted.sort_by_key(|d| d.order);

    sorted
        .into_iter()
        .filter_map(|detail| {
            let value = detail.value.as_deref()?;
            let text = strip_html(value);
            if text.trim().is_empty() {
                None
            } else {
                Some(format!("{}: {}", detail.name, text))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Lowercase haystack the skill filter searches: detail text followed by the title.
pub fn skill_haystack(job: &Job) -> String {
    let mut text = extract_details_text(&job.details).to_lowercase();
    text.push(' ');
    text.push_str(&job.name.to_lowercase());
    text
}

/// Candidate keywords of a posting: lowercase alphabetic tokens longer than
/// two characters that are not stopwords, in first-occurrence order.
pub fn extract_job_keywords(job: &Job) -> Vec<String> {
    let text = extract_details_text(&job.details);
    if text.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(|token| token.to_lowercase())
        .filter(|token| token.chars().count() > 2)
        .filter(|token| token.chars().any(|c| c.is_alphabetic()))
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
