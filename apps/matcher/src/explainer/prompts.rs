// Prompt templates for match explanations and missing-skill refinement.
// Placeholders are filled with `llm_client::prompts::fill`.

pub const EXPLANATION_SYSTEM: &str = "You are a career advisor helping a job seeker \
    understand why a position might be a good match. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

pub const EXPLANATION_PROMPT_TEMPLATE: &str = r#"CANDIDATE PROFILE:
Skills: {candidate_skills}
Tools/Frameworks: {candidate_tools}
Domains: {candidate_domains}
Years of Experience: {years_experience}

JOB POSITION:
Title: {job_title}
Company: {company_name}
Location: {job_location}
Description: {job_description}

MATCH SCORES:
Similarity Score: {similarity_score}
Skill Match Score: {filter_score}

Generate 2-3 concise bullet points explaining why this job is a good match for the candidate.
Focus on:
- Matching skills and technologies
- Relevant domain experience
- Career growth opportunities

Return a JSON object with this EXACT schema:
{"bullet_points": ["...", "..."]}"#;

pub const REFINE_SYSTEM: &str = "You are a career advisor helping candidates prepare \
    for job interviews. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

pub const REFINE_PROMPT_TEMPLATE: &str = r#"CANDIDATE PROFILE:
- Skills: {candidate_skills}
- Tools/Frameworks: {candidate_tools}
- Domains: {candidate_domains}
- Seniority: {candidate_seniority}

JOB POSITION:
- Title: {job_title}
- Company: {company_name}

RAW MISSING SKILLS (from keyword extraction):
{raw_missing_skills}

TASKS:
1. FILTER & EDIT the missing skills list:
   - Remove noise (generic words, duplicates, irrelevant terms)
   - Rephrase abbreviations to full names (e.g. "k8s" -> "Kubernetes")
   - Keep only genuine technical skills or requirements
   - Maximum 5-7 most important skills

2. Provide 1-2 INTERVIEW PREPARATION TIPS:
   - Actionable advice on what to strengthen or prepare
   - Focus on the gap between the candidate profile and the job requirements

Return a JSON object with this EXACT schema:
{"refined_skills": ["..."], "interview_tips": ["..."]}"#;
