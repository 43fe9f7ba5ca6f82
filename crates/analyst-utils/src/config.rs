//! Configuration management utilities
//!
//! All timeout, retry and logging settings are read once from the process
//! environment (optionally seeded from a `.env` file) and handed to the
//! crates that need them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Settings for the OpenAI-compatible model endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Endpoint base URL (`OPENAI_BASE_URL`), required at gateway construction
    pub base_url: Option<String>,
    /// API credential (`OPENAI_API_KEY`), required at gateway construction
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model identifier (`OPENAI_MODEL_NAME`)
    pub model: String,
    /// Per-request timeout in seconds (`LLM_TIMEOUT_SECONDS`)
    pub timeout_secs: u64,
    /// Retries after the first failed attempt (`LLM_MAX_RETRIES`)
    pub max_retries: u32,
    /// Sampling temperature (`LLM_TEMPERATURE`)
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: "sonar".to_string(),
            timeout_secs: 60,
            max_retries: 5,
            temperature: 0.0,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log verbosity (`LOG_LEVEL`)
    pub log_level: String,
    /// Language model settings
    pub llm: LlmSettings,
    /// Timeout for external data/search calls in seconds (`API_TIMEOUT_SECONDS`)
    pub api_timeout_secs: u64,
    /// Total attempts per external data/search call (`API_MAX_RETRIES`)
    pub api_max_retries: u32,
    /// Ceiling on orchestrator steps per run (`RECURSION_LIMIT`)
    pub recursion_limit: usize,
    /// Whether the company-profile stage runs (`ENABLE_COMPANY_PROFILE`)
    pub enable_company_profile: bool,
    /// HTTP listen address (`BIND_ADDR`)
    pub bind_addr: String,
    /// Directory holding `index.html` for the root page (`STATIC_DIR`)
    pub static_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            llm: LlmSettings::default(),
            api_timeout_secs: 60,
            api_max_retries: 5,
            recursion_limit: 100,
            enable_company_profile: true,
            bind_addr: "0.0.0.0:8000".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and read settings from the process environment
    pub fn load() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("Failed to load .env file: {e}");
            }
        }
        Self::from_env()
    }

    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function
    ///
    /// Unset keys fall back to defaults; unparsable values log a warning and
    /// fall back as well.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let llm_defaults = LlmSettings::default();

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            log_level: non_empty("LOG_LEVEL")
                .map_or(defaults.log_level, |v| v.trim().to_ascii_uppercase()),
            llm: LlmSettings {
                base_url: non_empty("OPENAI_BASE_URL"),
                api_key: non_empty("OPENAI_API_KEY"),
                model: non_empty("OPENAI_MODEL_NAME").unwrap_or(llm_defaults.model),
                timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECONDS", llm_defaults.timeout_secs),
                max_retries: parse_or(&lookup, "LLM_MAX_RETRIES", llm_defaults.max_retries),
                temperature: parse_or(&lookup, "LLM_TEMPERATURE", llm_defaults.temperature),
            },
            api_timeout_secs: parse_or(&lookup, "API_TIMEOUT_SECONDS", defaults.api_timeout_secs),
            api_max_retries: parse_or(&lookup, "API_MAX_RETRIES", defaults.api_max_retries),
            recursion_limit: parse_or(&lookup, "RECURSION_LIMIT", defaults.recursion_limit),
            enable_company_profile: parse_bool_or(
                &lookup,
                "ENABLE_COMPANY_PROFILE",
                defaults.enable_company_profile,
            ),
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            static_dir: non_empty("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {key}={raw:?}, using default {default}");
            default
        }),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!("Invalid boolean for {key}={raw:?}, using default {default}");
                default
            }
        },
    }
}
