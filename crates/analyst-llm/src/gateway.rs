//! The single model call contract used by every stage

use crate::providers::OpenAIProvider;
use crate::structured::parse_structured;
use crate::{CompletionRequest, LLMProvider, Message, ResponseFormat, Result, StructuredOutput};
use analyst_utils::LlmSettings;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Thin wrapper over a provider that fixes model, temperature and token cap
///
/// Cloning is cheap; the provider is shared.
#[derive(Clone)]
pub struct ModelGateway {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: Option<usize>,
}

impl fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelGateway")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    /// Build an OpenAI-compatible gateway from settings
    ///
    /// Fails with a configuration error when the endpoint or credential is
    /// missing.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let provider = OpenAIProvider::from_settings(settings)?;
        Ok(Self::new(Arc::new(provider), settings.model.clone()).with_temperature(settings.temperature))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap output tokens for every call made through this gateway
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, system: &str, user: &str) -> CompletionRequest {
        CompletionRequest::builder(&self.model)
            .system(system)
            .add_message(Message::user(user))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
    }

    /// Free-text call
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn invoke(&self, system: &str, user: &str) -> Result<String> {
        let response = self.provider.complete(self.request(system, user)).await?;
        debug!("Model returned {} chars", response.message.content.len());
        Ok(response.message.content)
    }

    /// Call constrained to the record shape `T`
    #[instrument(skip_all, fields(model = %self.model, shape = T::NAME))]
    pub async fn invoke_structured<T: StructuredOutput>(&self, system: &str, user: &str) -> Result<T> {
        let mut request = self.request(system, user);
        request.response_format = Some(ResponseFormat::json_schema(T::NAME, T::schema()));

        let response = self.provider.complete(request).await?;
        parse_structured(&response.message.content)
    }
}
