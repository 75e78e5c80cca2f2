/// LLM Client: the single point of entry for all Claude API calls in the tailor service.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All LLM interactions MUST go through this module.
///
/// Model and token budget are fixed per client instance; the violation detector
/// gets its own instance built from `EVALUATION_MODEL` / `EVALUATION_MAX_TOKENS`.
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Returns a client that sends `model` with a `max_tokens` budget.
    pub fn with_model(mut self, model: impl Into<String>, max_tokens: u32) -> Self {
        self.model = model.into();
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, prompt: &'a str, system: Option<&'a str>) -> AnthropicRequest<'a> {
        AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        }
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit), 5xx and transport errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: Option<&str>) -> Result<LlmResponse, LlmError> {
        let request_body = self.request(prompt, system);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call {} ({}) succeeded: input_tokens={}, output_tokens={}",
                llm_response.id,
                llm_response.model,
                llm_response.usage.input_tokens,
                llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        parse_json_text(text)
    }
}

/// Strips commentary and code fences, then deserializes.
pub fn parse_json_text<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Drops any prose before the JSON payload (the first ```json fence, or the
/// first `{` when there is no fence), then strips ```json ... ``` or
/// ``` ... ``` fences.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let text = match (text.find("```json"), text.find('{')) {
        (Some(fence), _) => &text[fence..],
        (None, Some(brace)) if !text.starts_with("```") => &text[brace..],
        _ => text,
    };

    if let Some(stripped) = text.strip_prefix("```json") {
        strip_closing_fence(stripped)
    } else if let Some(stripped) = text.strip_prefix("```") {
        strip_closing_fence(stripped)
    } else {
        text
    }
}

fn strip_closing_fence(text: &str) -> &str {
    let text = text.trim_start();
    match text.rfind("```") {
        Some(end) => text[..end].trim(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_prefatory_commentary_before_brace() {
        let input = "Here is my evaluation of the documents:\n\n{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_prefatory_commentary_before_fence() {
        let input = "I checked every number.\n```json\n{\"key\": {\"nested\": 1}}\n```\nDone.";
        assert_eq!(strip_json_fences(input), "{\"key\": {\"nested\": 1}}");
    }

    #[test]
    fn test_parse_json_text_into_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Out {
            score: u32,
        }
        let out: Out = parse_json_text("Sure!\n{\"score\": 88}").unwrap();
        assert_eq!(out, Out { score: 88 });
    }

    #[test]
    fn test_parse_json_text_rejects_garbage() {
        let result: Result<serde_json::Value, _> = parse_json_text("no json here");
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_request_omits_absent_system_prompt() {
        let client = LlmClient::new("test-key".to_string())
            .unwrap()
            .with_model("claude-test", 16000);
        let body = serde_json::to_value(client.request("hello", None)).unwrap();
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 16000);
        assert!(body.get("system").is_none());
        assert_eq!(body["messages"][0]["role"], "user");

        let body = serde_json::to_value(client.request("hello", Some("be strict"))).unwrap();
        assert_eq!(body["system"], "be strict");
    }

    #[test]
    fn test_response_text_takes_first_text_block() {
        let response: LlmResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "role": "assistant",
                "model": "claude-sonnet-4-5",
                "content": [{"type": "tool_use"}, {"type": "text", "text": "{}"}],
                "usage": {"input_tokens": 10, "output_tokens": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(response.id, "msg_01");
        assert_eq!(response.text(), Some("{}"));
    }
}
