//! OpenAI-compatible provider implementation
//!
//! Talks to any endpoint implementing the `/chat/completions` API (OpenAI,
//! Perplexity, vLLM, LM Studio, ...).
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! # Example
//!
//! ```no_run
//! use analyst_llm::{CompletionRequest, LLMProvider, Message};
//! use analyst_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OpenAIConfig::new("sk-...")
//!         .with_api_base("https://api.perplexity.ai")
//!         .with_timeout(60)
//!         .with_max_retries(5);
//!     let provider = OpenAIProvider::with_config(config)?;
//!
//!     let request = CompletionRequest::builder("sonar")
//!         .add_message(Message::user("Hello!"))
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.text());
//!     Ok(())
//! }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, ResponseFormat, Result,
    Role, StopReason, TokenUsage,
};
use analyst_core::RetryPolicy;
use analyst_utils::LlmSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the API, without the `/chat/completions` suffix
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Wait before the first retry; doubles after each attempt
    pub initial_backoff: Duration,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Build config from application settings
    ///
    /// Both the endpoint and the credential are required.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_base = settings.base_url.clone().ok_or_else(|| {
            LLMError::ConfigurationError("OPENAI_BASE_URL is not set".to_string())
        })?;
        let api_key = settings.api_key.clone().ok_or_else(|| {
            LLMError::ConfigurationError("OPENAI_API_KEY is not set".to_string())
        })?;

        Ok(Self::new(api_key)
            .with_api_base(api_base)
            .with_timeout(settings.timeout_secs)
            .with_max_retries(settings.max_retries))
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the number of retries after the first attempt
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first retry wait
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries.saturating_add(1),
            self.initial_backoff,
            Duration::from_secs(60),
        )
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// OpenAI-compatible chat completions provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
    retry: RetryPolicy,
}

impl OpenAIProvider {
    /// Create a new provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let retry = config.retry_policy();

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Create a provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from application settings
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Self::with_config(OpenAIConfig::from_settings(settings)?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    async fn send_once(&self, body: &OpenAIRequest<'_>) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(body.model.to_string()),
                code if status.is_server_error() => LLMError::ServerError {
                    status: code,
                    body: error_text,
                },
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        let usage = openai_response.usage.unwrap_or_default();
        debug!(
            "Received response - finish_reason: {:?}, tokens: {}/{}",
            choice.finish_reason, usage.prompt_tokens, usage.completion_tokens
        );

        Ok(CompletionResponse {
            message: Message::assistant(response_text(choice.message)),
            stop_reason: map_stop_reason(choice.finish_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to {}", self.config.api_base);

        let body = OpenAIRequest {
            model: &request.model,
            messages: build_openai_messages(request.system.as_deref(), &request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.response_format.as_ref(),
        };

        self.retry
            .execute("chat_completion", || self.send_once(&body), LLMError::is_retryable)
            .await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ============================================================================
// OpenAI-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: Role,
    content: &'a str,
}

// ============================================================================
// OpenAI-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseToolCall {
    function: OpenAIResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseFunctionCall {
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// System prompt goes first in the messages array
fn build_openai_messages<'a>(system: Option<&'a str>, messages: &'a [Message]) -> Vec<OpenAIMessage<'a>> {
    system
        .map(|content| OpenAIMessage {
            role: Role::System,
            content,
        })
        .into_iter()
        .chain(messages.iter().map(|m| OpenAIMessage {
            role: m.role,
            content: &m.content,
        }))
        .collect()
}

/// Message content, falling back to the first tool call's arguments
///
/// Some compatible servers return structured output as a function call even
/// when a `response_format` was requested.
fn response_text(message: OpenAIResponseMessage) -> String {
    match message.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => message
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
            .map(|call| call.function.arguments)
            .unwrap_or_default(),
    }
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::MaxTokens,
        Some("tool_calls" | "function_call") => StopReason::ToolUse,
        Some("content_filter") => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAIConfig::new("sk-test")
            .with_api_base("http://localhost:1234/v1/")
            .with_timeout(30)
            .with_max_retries(2);

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.api_base, "http://localhost:1234/v1");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.retry_policy().max_attempts, 3);
    }

    #[test]
    fn test_config_from_settings_requires_endpoint_and_key() {
        let mut settings = LlmSettings::default();
        assert!(matches!(
            OpenAIConfig::from_settings(&settings),
            Err(LLMError::ConfigurationError(msg)) if msg.contains("OPENAI_BASE_URL")
        ));

        settings.base_url = Some("http://localhost:1234/v1".into());
        assert!(matches!(
            OpenAIConfig::from_settings(&settings),
            Err(LLMError::ConfigurationError(msg)) if msg.contains("OPENAI_API_KEY")
        ));

        settings.api_key = Some("sk-test".into());
        let config = OpenAIConfig::from_settings(&settings).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_system_message_first() {
        let messages = vec![Message::user("Hello")];
        let result = build_openai_messages(Some("Be terse"), &messages);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].role, Role::System);
        assert_eq!(result[0].content, "Be terse");
        assert_eq!(result[1].role, Role::User);
    }

    #[test]
    fn test_request_serialization_with_schema() {
        let format = ResponseFormat::json_schema("planner_output", serde_json::json!({"type": "object"}));
        let messages = vec![Message::user("hi")];
        let body = OpenAIRequest {
            model: "sonar",
            messages: build_openai_messages(None, &messages),
            max_tokens: None,
            temperature: Some(0.0),
            response_format: Some(&format),
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason(Some("stop")), StopReason::EndTurn);
        assert_eq!(map_stop_reason(Some("length")), StopReason::MaxTokens);
        assert_eq!(map_stop_reason(Some("tool_calls")), StopReason::ToolUse);
        assert_eq!(map_stop_reason(None), StopReason::EndTurn);
    }

    #[test]
    fn test_tool_call_fallback() {
        let message: OpenAIResponseMessage = serde_json::from_value(serde_json::json!({
            "content": "",
            "tool_calls": [{"function": {"arguments": "{\"ticker\":\"AAPL\"}"}}]
        }))
        .unwrap();
        assert_eq!(response_text(message), r#"{"ticker":"AAPL"}"#);
    }
}
