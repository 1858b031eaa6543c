//! LLM API client abstraction for OpenAI, Anthropic and Ollama.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client as OpenAIClient,
};
use async_trait::async_trait;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// LLM provider selection.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI (GPT models).
    #[display("openai")]
    OpenAI,
    /// Anthropic (Claude models).
    #[display("anthropic")]
    Anthropic,
    /// Local models served by Ollama.
    #[display("ollama")]
    Ollama,
}

/// Configuration for LLM client.
#[derive(Debug, Clone, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct LlmConfig {
    /// Provider to call.
    #[setters(skip)]
    provider: LlmProvider,
    /// API key; empty for Ollama.
    #[getter(skip)]
    #[setters(skip)]
    api_key: String,
    /// Provider model id.
    #[setters(skip)]
    model: String,
    /// Completion token limit.
    max_tokens: u32,
    /// Sampling temperature.
    temperature: f32,
    /// Endpoint override (Ollama base URL).
    #[setters(strip_option, into)]
    base_url: Option<String>,
}

impl LlmConfig {
    /// Creates a new LLM configuration.
    #[instrument(skip(api_key), fields(provider = ?provider, model = %model))]
    pub fn new(provider: LlmProvider, api_key: String, model: String, max_tokens: u32) -> Self {
        debug!("Creating LLM config");
        Self {
            provider,
            api_key,
            model,
            max_tokens,
            temperature: 0.1,
            base_url: None,
        }
    }
}

/// Text and token usage from one completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Completion {
    /// Generated text.
    pub content: String,
    /// Prompt plus completion tokens, as reported or estimated.
    pub tokens: u64,
}

/// Rough token estimate used when a provider reports no usage.
pub fn estimate_tokens(texts: &[&str]) -> u64 {
    let chars: usize = texts.iter().map(|t| t.chars().count()).sum();
    (chars as u64).div_ceil(4)
}

/// A source of single-shot completions.
///
/// Agents hold one of these rather than a concrete client so the model can be
/// swapped at runtime and so tests can script replies.
#[async_trait]
pub trait CompletionBackend: Send + Sync + std::fmt::Debug {
    /// Runs one completion.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<Completion, LlmError>;
}

/// LLM client that abstracts over multiple providers.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [AnthropicMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = ?config.provider()))]
    pub fn new(config: LlmConfig) -> Self {
        info!("Creating LLM client");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Generates a completion from a system prompt and user message.
    #[instrument(skip(self, system_prompt, user_message), fields(provider = ?self.config.provider, model = %self.config.model))]
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Completion, LlmError> {
        debug!("Generating completion");
        match self.config.provider {
            LlmProvider::OpenAI => self.generate_openai(system_prompt, user_message).await,
            LlmProvider::Anthropic => self.generate_anthropic(system_prompt, user_message).await,
            LlmProvider::Ollama => self.generate_ollama(system_prompt, user_message).await,
        }
    }

    /// Generates a completion using Anthropic Claude.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_anthropic(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Completion, LlmError> {
        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: system_prompt,
            messages: [AnthropicMessage {
                role: "user",
                content: user_message,
            }],
        };

        debug!("Sending request to Anthropic");
        let response = self
            .http
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Anthropic API request failed");
                LlmError::new(format!("Anthropic API request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, response = %body, "Anthropic API error");
            return Err(LlmError::new(format!("Anthropic API error {}: {}", status, body)));
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse Anthropic response");
            LlmError::new(format!("Failed to parse Anthropic response: {}", e))
        })?;

        let content = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| LlmError::new("No text content in Anthropic response".to_string()))?;

        let tokens = parsed
            .usage
            .map(|usage| usage.input_tokens + usage.output_tokens)
            .unwrap_or_else(|| estimate_tokens(&[system_prompt, user_message, &content]));

        info!(content_length = content.len(), tokens, "Generated completion");
        Ok(Completion::new(content, tokens))
    }

    /// Generates a completion using OpenAI.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_openai(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Completion, LlmError> {
        let client = OpenAIClient::with_config(
            OpenAIConfig::new().with_api_key(self.config.api_key.clone()),
        );

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|e| LlmError::new(format!("Failed to build system message: {}", e)))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()
                    .map_err(|e| LlmError::new(format!("Failed to build user message: {}", e)))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .max_completion_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build request");
                LlmError::new(format!("Failed to build request: {}", e))
            })?;

        debug!("Sending request to OpenAI");
        let response = client.chat().create(request).await.map_err(|e| {
            error!(error = ?e, "OpenAI API error");
            LlmError::new(format!("OpenAI API error: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                error!("No content in OpenAI response");
                LlmError::new("No content in OpenAI response".to_string())
            })?;

        let tokens = response
            .usage
            .as_ref()
            .map(|usage| usage.total_tokens as u64)
            .unwrap_or_else(|| estimate_tokens(&[system_prompt, user_message, &content]));

        info!(content_length = content.len(), tokens, "Generated completion");
        Ok(Completion::new(content, tokens))
    }

    /// Generates a completion using a local Ollama server.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_ollama(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<Completion, LlmError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(crate::config::DEFAULT_OLLAMA_URL)
            .trim_end_matches('/');

        let request = OllamaGenerateRequest {
            model: &self.config.model,
            prompt: user_message,
            system: system_prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        debug!(%base_url, "Sending request to Ollama");
        let response = self
            .http
            .post(format!("{}/api/generate", base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Ollama request failed");
                LlmError::new(format!("Ollama request failed (is the server running at {}?): {}", base_url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, response = %body, "Ollama returned error");
            return Err(LlmError::new(format!("Ollama error {}: {}", status, body)));
        }

        let parsed: OllamaGenerateResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse Ollama response");
            LlmError::new(format!("Failed to parse Ollama response: {}", e))
        })?;

        let tokens = match (parsed.prompt_eval_count, parsed.eval_count) {
            (Some(prompt), Some(eval)) => prompt + eval,
            _ => estimate_tokens(&[system_prompt, user_message, &parsed.response]),
        };

        info!(content_length = parsed.response.len(), tokens, "Generated completion");
        Ok(Completion::new(parsed.response, tokens))
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<Completion, LlmError> {
        self.generate(system_prompt, user_message).await
    }
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error: {} at {}:{}", message, file, line)]
pub struct LlmError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "LLM error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_serializes_lowercase() {
        let json = serde_json::to_string(&LlmProvider::OpenAI).unwrap();
        assert_eq!(json, "\"openai\"");
        let parsed: LlmProvider = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(parsed, LlmProvider::Ollama);
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(&[]), 0);
        assert_eq!(estimate_tokens(&["abcde"]), 2);
        assert_eq!(estimate_tokens(&["ab", "cd"]), 1);
    }

    #[test]
    fn test_config_setters() {
        let config = LlmConfig::new(LlmProvider::Ollama, String::new(), "llama3.2:1b".into(), 256)
            .with_temperature(0.4)
            .with_base_url("http://gpu-box:11434");
        assert_eq!(*config.temperature(), 0.4);
        assert_eq!(config.base_url().as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.model(), "llama3.2:1b");
    }
}
