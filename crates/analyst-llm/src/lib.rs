//! Model gateway for the persona analyst pipeline
//!
//! This crate provides the single call contract every stage uses to talk to
//! a language model. It includes:
//!
//! - Message and completion request/response types
//! - The [`LLMProvider`] trait and an OpenAI-compatible implementation
//! - [`ModelGateway`], which adds structured output on top of a provider
//! - Sanitizers for artifacts some models leave in free text
//! - `testing::ScriptedProvider` for offline runs (feature `testing`)

pub mod completion;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod sanitize;
pub mod structured;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use completion::{
    CompletionRequest, CompletionResponse, JsonSchemaFormat, ResponseFormat, StopReason,
    TokenUsage,
};
pub use error::{LLMError, Result};
pub use gateway::ModelGateway;
pub use messages::{Message, Role};
pub use provider::LLMProvider;
pub use sanitize::{strip_citation_markers, strip_tool_calls};
pub use structured::{StructuredOutput, extract_json};
