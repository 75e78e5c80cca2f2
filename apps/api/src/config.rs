use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;

const DEFAULT_EVALUATION_MAX_TOKENS: u32 = 16000;
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 300;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Root of the evaluation records and `.rag-index.json`.
    pub output_dir: PathBuf,
    /// Source-of-truth facts JSON.
    pub summaries_path: PathBuf,
    pub evaluation_model: String,
    pub evaluation_max_tokens: u32,
    pub attempt_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            output_dir: PathBuf::from(require("OUTPUT_DIR")?),
            summaries_path: PathBuf::from(require("SUMMARIES_PATH")?),
            evaluation_model: lookup("EVALUATION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            evaluation_max_tokens: lookup("EVALUATION_MAX_TOKENS")
                .map(|v| v.parse::<u32>())
                .transpose()
                .context("EVALUATION_MAX_TOKENS must be a positive integer")?
                .unwrap_or(DEFAULT_EVALUATION_MAX_TOKENS),
            attempt_timeout_secs: lookup("ATTEMPT_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("ATTEMPT_TIMEOUT_SECS must be a whole number of seconds")?
                .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("ANTHROPIC_API_KEY", "sk-test"),
        ("OUTPUT_DIR", "/tmp/apps"),
        ("SUMMARIES_PATH", "/tmp/summaries.json"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.evaluation_model, DEFAULT_MODEL);
        assert_eq!(config.evaluation_max_tokens, 16000);
        assert_eq!(config.attempt_timeout(), Duration::from_secs(300));
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/apps"));
    }

    #[test]
    fn test_overrides_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("EVALUATION_MODEL", "claude-opus"),
            ("EVALUATION_MAX_TOKENS", "8000"),
            ("ATTEMPT_TIMEOUT_SECS", "60"),
            ("PORT", "9000"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.evaluation_model, "claude-opus");
        assert_eq!(config.evaluation_max_tokens, 8000);
        assert_eq!(config.attempt_timeout_secs, 60);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_missing_required_variable_is_named() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("SUMMARIES_PATH"));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ATTEMPT_TIMEOUT_SECS", "five minutes"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }
}
