//! Multi-persona stock analysis
//!
//! This crate turns a free-text request into an investment report through a
//! fixed sequence of stages. It includes:
//!
//! - Data collection from Yahoo Finance and DuckDuckGo web search
//! - An optional factual company profile
//! - Generation of four contrasting analyst personas
//! - One structured analysis per persona
//! - A Markdown report synthesizing all perspectives
//!
//! # Architecture
//!
//! [`AnalysisPipeline`] runs the stages in order over a [`PipelineState`]:
//! - `PlannerStage`: extracts intent and ticker
//! - `StockInfoStage`: collects financial data and search results
//! - `ProfilerStage`: builds the company profile (toggleable)
//! - `PersonaStage`: generates the personas
//! - `AnalysisStage`: analyzes the stock once per persona
//! - `ReportStage`: writes the final report
//!
//! # Example
//!
//! ```rust,ignore
//! use analyst_stock::AnalysisPipeline;
//! use analyst_utils::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load();
//!     let pipeline = AnalysisPipeline::from_settings(&settings)?;
//!
//!     let state = pipeline.run("Tell me about Apple stock").await?;
//!     println!("{}", state.report_text());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod stages;
pub mod state;

// Re-export main types for convenience
pub use api::{DuckDuckGoClient, FinancialSnapshot, SearchHit, YahooFinanceClient};
pub use collector::{DataCollector, FinancialDataProvider, SearchProvider};
pub use config::StockConfig;
pub use error::{Result, StockError};
pub use model::{
    CompanyProfile, DecisionRequest, ExecutiveSummary, PERSONA_COUNT, Persona, PersonaAnalysis,
    PersonaCollection, PersonaPerspective, PlannerOutput, Recommendation, ValueOrientation,
};
pub use pipeline::AnalysisPipeline;
pub use state::{PipelineState, StateUpdate};
