//! Shared utilities for the persona analyst pipeline
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and environment-sourced configuration.

pub mod config;
pub mod logging;

pub use config::{LlmSettings, Settings};
pub use logging::init_tracing_with_level;
