//! LLM post-processing of extracted page text

use crate::config::LlmConfig;
use crate::ExtractionError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Please provide a concise and informative response.";

/// Returned instead of calling the model when a page has no text
pub const NO_TEXT_PLACEHOLDER: &str = "No text to analyze.";

/// Turns page text into a model response
///
/// `provider`, `model` and `prompt` are passed through from configuration
/// unmodified.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        provider: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, ExtractionError>;
}

/// Runs the summarizer for one page, never failing
///
/// # Returns
///
/// The model output, or a placeholder, paired with a warning when the call
/// failed.
pub async fn apply_llm(
    summarizer: &dyn Summarizer,
    text: Option<&str>,
    config: &LlmConfig,
) -> (String, Option<String>) {
    let text = match text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return (NO_TEXT_PLACEHOLDER.to_string(), None),
    };

    match summarizer
        .summarize(text, &config.provider, &config.model, &config.prompt)
        .await
    {
        Ok(response) => (response, None),
        Err(e) => {
            let message = match e {
                ExtractionError::Llm(message) => message,
                other => other.to_string(),
            };
            let warning = format!("Error from LLM: {}", message);
            (format!("Error: {}", message), Some(warning))
        }
    }
}

/// Chat-completions client for OpenRouter (or any compatible endpoint)
pub struct OpenRouterSummarizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenRouterSummarizer {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    /// Reads the API key from the environment variable named in the config
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self::new(&config.endpoint, api_key)
    }
}

#[async_trait]
impl Summarizer for OpenRouterSummarizer {
    async fn summarize(
        &self,
        text: &str,
        _provider: &str,
        model: &str,
        prompt: &str,
    ) -> Result<String, ExtractionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ExtractionError::Llm("No API key found. Set the configured API key variable.".to_string())
        })?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| ExtractionError::Llm("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let system_prompt = if prompt.is_empty() {
            DEFAULT_SYSTEM_PROMPT
        } else {
            prompt
        };
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Llm(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ExtractionError::Llm(format!(
                "LLM API error: {}",
                resp.status()
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ExtractionError::Llm(format!("failed to parse LLM response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ExtractionError::Llm("LLM response had no choices".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
