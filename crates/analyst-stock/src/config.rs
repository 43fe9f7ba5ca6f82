//! Configuration for stock analysis operations

use crate::error::{Result, StockError};
use analyst_core::RetryPolicy;
use analyst_utils::Settings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the analysis pipeline's data collection and stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockConfig {
    /// Results requested per search query
    pub search_max_results: usize,

    /// Total attempts per external data/search call
    pub max_retries: u32,

    /// Wait before the first retry; doubles after each attempt
    pub retry_backoff_base: Duration,

    /// Upper bound of the random delay added to each wait
    pub retry_jitter: Duration,

    /// Request timeout duration for data/search providers
    pub request_timeout: Duration,

    /// Characters of financial info shown to the persona generator
    pub persona_context_chars: usize,

    /// Output token cap for each persona analysis
    pub analysis_max_tokens: usize,

    /// Output token cap for the company profile
    pub profile_max_tokens: usize,

    /// Whether the company-profile stage runs
    pub enable_company_profile: bool,

    /// Ceiling on stage steps per run
    pub step_limit: usize,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            search_max_results: 5,
            max_retries: 5,
            retry_backoff_base: Duration::from_secs(1),
            retry_jitter: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
            persona_context_chars: 1000,
            analysis_max_tokens: 16384,
            profile_max_tokens: 16384,
            enable_company_profile: true,
            step_limit: 100,
        }
    }
}

impl StockConfig {
    /// Create a new configuration builder
    pub fn builder() -> StockConfigBuilder {
        StockConfigBuilder::default()
    }

    /// Derive from application settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::builder()
            .max_retries(settings.api_max_retries)
            .request_timeout(Duration::from_secs(settings.api_timeout_secs))
            .enable_company_profile(settings.enable_company_profile)
            .step_limit(settings.recursion_limit)
            .build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(StockError::ConfigError(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.search_max_results == 0 {
            return Err(StockError::ConfigError(
                "search_max_results must be greater than 0".to_string(),
            ));
        }

        if self.step_limit == 0 {
            return Err(StockError::ConfigError(
                "step_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy for data and search calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_backoff_base, Duration::from_secs(60))
            .with_jitter(self.retry_jitter)
    }
}

/// Builder for StockConfig
#[derive(Debug, Default)]
pub struct StockConfigBuilder {
    search_max_results: Option<usize>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    retry_jitter: Option<Duration>,
    request_timeout: Option<Duration>,
    persona_context_chars: Option<usize>,
    analysis_max_tokens: Option<usize>,
    profile_max_tokens: Option<usize>,
    enable_company_profile: Option<bool>,
    step_limit: Option<usize>,
}

impl StockConfigBuilder {
    /// Set results requested per search query
    pub fn search_max_results(mut self, n: usize) -> Self {
        self.search_max_results = Some(n);
        self
    }

    /// Set total attempts per external call
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set retry jitter bound
    pub fn retry_jitter(mut self, duration: Duration) -> Self {
        self.retry_jitter = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn persona_context_chars(mut self, chars: usize) -> Self {
        self.persona_context_chars = Some(chars);
        self
    }

    pub fn analysis_max_tokens(mut self, tokens: usize) -> Self {
        self.analysis_max_tokens = Some(tokens);
        self
    }

    pub fn profile_max_tokens(mut self, tokens: usize) -> Self {
        self.profile_max_tokens = Some(tokens);
        self
    }

    /// Toggle the company-profile stage
    pub fn enable_company_profile(mut self, enabled: bool) -> Self {
        self.enable_company_profile = Some(enabled);
        self
    }

    /// Set the step ceiling
    pub fn step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StockConfig> {
        let defaults = StockConfig::default();

        let config = StockConfig {
            search_max_results: self.search_max_results.unwrap_or(defaults.search_max_results),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            retry_jitter: self.retry_jitter.unwrap_or(defaults.retry_jitter),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            persona_context_chars: self
                .persona_context_chars
                .unwrap_or(defaults.persona_context_chars),
            analysis_max_tokens: self.analysis_max_tokens.unwrap_or(defaults.analysis_max_tokens),
            profile_max_tokens: self.profile_max_tokens.unwrap_or(defaults.profile_max_tokens),
            enable_company_profile: self
                .enable_company_profile
                .unwrap_or(defaults.enable_company_profile),
            step_limit: self.step_limit.unwrap_or(defaults.step_limit),
        };

        config.validate()?;
        Ok(config)
    }
}
