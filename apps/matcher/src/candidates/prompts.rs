// Prompt for turning raw CV text into a structured profile.

pub const CV_PARSE_SYSTEM: &str = "You are a professional CV/resume parser. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Replace `{cv_text}` before sending.
pub const CV_PARSE_PROMPT_TEMPLATE: &str = r#"Analyze the following CV text and extract structured information.

CV TEXT:
{cv_text}

Return a JSON object with this EXACT schema (no extra fields):
{
  "skills": ["technical and soft skills"],
  "tools_frameworks": ["specific tools, frameworks and technologies"],
  "seniority": "junior | mid | senior | lead | principal | staff",
  "years_experience": 6,
  "domains": ["industry domains, e.g. fintech, healthcare"],
  "keywords": ["additional relevant keywords for matching"]
}

Guidelines:
- Be thorough but avoid duplicating items across categories
- Normalize all values to lowercase
- years_experience is null when it cannot be determined
- For seniority, infer from years of experience and role titles:
  - junior: 0-2 years, entry-level roles
  - mid: 2-5 years, independent contributor
  - senior: 5-8 years, mentoring others
  - lead: 8+ years, team leadership
  - principal: 10+ years, technical strategy
  - staff: 12+ years, organization-wide impact"#;
