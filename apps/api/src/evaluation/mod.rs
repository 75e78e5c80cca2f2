// Evaluation loop: detect violations in a draft pair, auto-fix the known
// patterns, re-check, then score, persist and re-index.
// Every detector call goes through llm_client.

pub mod cancel;
pub mod detector;
pub mod fixer;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
