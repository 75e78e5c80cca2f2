// All LLM prompt constants for the Evaluation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Evaluation prompt template. Every `{placeholder}` is replaced before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"You are a resume evaluation specialist. Your job is to score generated resumes and cover letters for FACTUAL ACCURACY and compliance with anti-fabrication rules.

{evaluator_stance}

TARGET: {company} - {role}

JOB DESCRIPTION:
{brief_text}

SOURCE ACHIEVEMENTS (GROUND TRUTH):
{achievements_json}

SOURCE SKILLS (GROUND TRUTH):
{skills_json}

SOURCE PROFILE (GROUND TRUTH):
{profile_json}

GENERATED RESUME:
{primary_draft}

GENERATED COVER LETTER:
{secondary_draft}

Evaluate the generated resume and cover letter against these rules:

RULE 1: FORBIDDEN_NUMBER_FABRICATION
Every number must appear in the source achievements' metrics. "managed 70+ engineers" with no team size in source is fabricated.

RULE 2: FORBIDDEN_INDUSTRY_CLAIMS
Industries ("climate-tech", "gaming", "healthcare") claimed without a source company in that industry are fabricated.

RULE 3: FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS
Domain terms ("satellite imagery processing", "geospatial analysis") with zero source work in that domain are fabricated.

RULE 4: FORBIDDEN_PATTERN_MATCHING
Claims that the candidate's work "mirrors", is "similar to" or "translates to" a domain they lack are fabricated.

RULE 5: WEAK_QUANTIFICATIONS
Small numbers that undermine credibility ("7 clusters", "3 regions", "2 weeks") are minor issues, not fabrications.

RULE 6: ACCURACY
- Years of experience must exactly match profile.years_experience.
- Company names, role titles and dates must exactly match source achievements.
- Every percentage and dollar amount must be in source achievement metrics (METRIC_FABRICATION).
- Claims of N years with a technology that has not existed for N years are TEMPORAL_IMPOSSIBILITY.

For EACH violation provide:
{
  "rule": "FORBIDDEN_NUMBER_FABRICATION",
  "severity": "critical|major|minor",
  "location": "resume.md:line_number or cover.md:line_number",
  "fabricated": "exact text that was fabricated",
  "evidence_checked": "what you checked in source and didn't find",
  "suggested_fix": "how to fix it"
}

Return ONLY valid JSON in this format:
{
  "resume_violations": [],
  "weak_quantifications": [{"location": "", "weak_number": "", "suggested": "", "fixed": false}],
  "accuracy_violations": [],
  "cover_letter_violations": [],
  "verified_metrics": ["metrics you verified ARE in source"],
  "company_dates_correct": true,
  "role_titles_correct": true,
  "years_exp_correct": true,
  "jd_match": {
    "matched": ["requirements the candidate meets"],
    "unmatched": ["requirements the candidate lacks"],
    "fabrications_to_match": ["things fabricated to match the job description"]
  },
  "lessons_learned": ["key takeaways about what went wrong"]
}

BE THOROUGH. Check EVERY number, EVERY industry claim, EVERY domain term."#;
