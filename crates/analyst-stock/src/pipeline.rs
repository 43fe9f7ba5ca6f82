//! The analysis pipeline
//!
//! Planner -> data collection -> [company profile] -> personas -> analyses ->
//! report, each stage run once and in order.

use crate::api::{DuckDuckGoClient, YahooFinanceClient};
use crate::collector::DataCollector;
use crate::config::StockConfig;
use crate::stages::{
    self, AnalysisStage, PersonaStage, PlannerStage, ProfilerStage, ReportStage, StockInfoStage,
};
use crate::state::PipelineState;
use analyst_core::{Result, RunContext, StatusEmitter, StatusEvent};
use analyst_llm::ModelGateway;
use analyst_utils::Settings;
use analyst_workflow::Pipeline;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Multi-persona investment analysis pipeline
pub struct AnalysisPipeline {
    pipeline: Pipeline<PipelineState>,
}

impl AnalysisPipeline {
    /// Assemble the stages around a model gateway and data collector
    pub fn new(gateway: ModelGateway, collector: DataCollector, config: &StockConfig) -> Result<Self> {
        config.validate()?;

        let profile_gateway = gateway.clone().with_max_tokens(config.profile_max_tokens);
        let analysis_gateway = gateway.clone().with_max_tokens(config.analysis_max_tokens);

        let pipeline = Pipeline::<PipelineState>::builder()
            .add_stage(Arc::new(PlannerStage::new(gateway.clone())))
            .add_stage(Arc::new(StockInfoStage::new(collector)))
            .add_stage_if(
                config.enable_company_profile,
                Arc::new(ProfilerStage::new(profile_gateway)),
            )
            .add_stage(Arc::new(PersonaStage::new(
                gateway.clone(),
                config.persona_context_chars,
            )))
            .add_stage(Arc::new(AnalysisStage::new(analysis_gateway)))
            .add_stage(Arc::new(ReportStage::new(gateway)))
            .step_limit(config.step_limit)
            .build()?;

        Ok(Self { pipeline })
    }

    /// Build with the OpenAI-compatible gateway, Yahoo Finance and DuckDuckGo
    ///
    /// Fails when the model endpoint or credential is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let config = StockConfig::from_settings(settings)?;
        let gateway = ModelGateway::from_settings(&settings.llm)?;

        let financial = YahooFinanceClient::new(config.request_timeout)?;
        let search = DuckDuckGoClient::new(config.request_timeout)?;
        let collector = DataCollector::new(Arc::new(financial), Arc::new(search), &config);

        Self::new(gateway, collector, &config)
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.pipeline.stage_names()
    }

    /// Run without a listener
    pub async fn run(&self, user_message: &str) -> Result<PipelineState> {
        self.run_with(user_message, &RunContext::new()).await
    }

    /// Run, emitting a `step` event after each stage
    pub async fn run_with(&self, user_message: &str, ctx: &RunContext) -> Result<PipelineState> {
        info!(run_id = %ctx.run_id(), "Analyzing: {user_message}");
        self.pipeline
            .execute_with(PipelineState::new(user_message), ctx, |node, state| {
                ctx.emit(step_event(node, state));
            })
            .await
    }

    /// Run and finish the event stream with exactly one `complete` or `error`
    pub async fn run_streaming(
        &self,
        user_message: &str,
        emitter: StatusEmitter,
    ) -> Result<PipelineState> {
        let ctx = RunContext::new().with_emitter(emitter);
        let result = self.run_with(user_message, &ctx).await;

        match &result {
            Ok(_) => ctx.emit(StatusEvent::complete()),
            Err(e) => {
                error!(run_id = %ctx.run_id(), "Pipeline failed: {e}");
                ctx.emit(StatusEvent::error(e.to_string()));
            }
        }
        result
    }
}

/// `step` event describing what a stage just produced
pub fn step_event(node: &str, state: &PipelineState) -> StatusEvent {
    let event = |message: String| StatusEvent::step(node, stages::node_label(node), message);

    match node {
        stages::PLANNER => event(format!("Identified ticker: {}", opt(&state.ticker)))
            .with_field("ticker", to_value(&state.ticker))
            .with_field("intent", to_value(&state.intent))
            .with_field("reasoning", to_value(&state.reasoning)),
        stages::STOCK_INFO => {
            let chars = state.financial_info.as_deref().map_or(0, |s| s.chars().count());
            event(format!("Collected {chars} chars of financial data"))
                .with_field("financial_info", to_value(&state.financial_info))
        }
        stages::FINANCIAL_REPORTER => event("Company profile generated".to_string())
            .with_field("company_profile", to_value(&state.company_profile)),
        stages::GENERATE_PERSONAS => {
            let count = state.personas.as_ref().map_or(0, Vec::len);
            event(format!("Generated {count} analyst personas"))
                .with_field("personas", to_value(&state.personas))
        }
        stages::ANALYSIS => {
            let count = state.persona_analyses.as_ref().map_or(0, Vec::len);
            event(format!("Completed {count} persona analyses"))
                .with_field("persona_analyses", to_value(&state.persona_analyses))
        }
        stages::GENERATE_REPORT => event("Report generated successfully".to_string())
            .with_field("report", to_value(&state.report)),
        _ => event(format!("{node} completed")),
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}
