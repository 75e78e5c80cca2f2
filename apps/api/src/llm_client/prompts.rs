// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Reminds an auditing model that it is not the author of the text under review.
pub const EVALUATOR_STANCE: &str = "\
    CRITICAL: You are NOT the generator. You are the EVALUATOR. \
    Your job is to find problems, not defend the output.";
