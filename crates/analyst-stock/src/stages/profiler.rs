//! Company profile stage

use super::FINANCIAL_REPORTER;
use crate::model::CompanyProfile;
use crate::prompts::{self, system};
use crate::state::{PipelineState, StateUpdate};
use analyst_core::{Result, RunContext, Stage};
use analyst_llm::ModelGateway;
use async_trait::async_trait;
use tracing::info;

/// Derives a factual company profile from the collected financial text
pub struct ProfilerStage {
    gateway: ModelGateway,
}

impl ProfilerStage {
    /// `gateway` should already carry the profile output-token cap
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Stage<PipelineState> for ProfilerStage {
    fn name(&self) -> &str {
        FINANCIAL_REPORTER
    }

    async fn run(&self, state: &PipelineState, ctx: &RunContext) -> Result<StateUpdate> {
        let ticker = state.ticker(FINANCIAL_REPORTER)?;
        let financial_info = state.financial_info(FINANCIAL_REPORTER)?;

        ctx.status(
            FINANCIAL_REPORTER,
            "Generating company profile",
            "Analyzing financial data to build company profile…",
        );

        let user_prompt = prompts::company_profile_request(ticker, financial_info)?;
        let profile: CompanyProfile = self
            .gateway
            .invoke_structured(system::FINANCIAL_REPORTER, &user_prompt)
            .await?;

        info!(
            "Company profile generated: business_model={} chars, competitive_edge={} chars",
            profile.business_model.len(),
            profile.competitive_edge.len()
        );
        ctx.status(
            FINANCIAL_REPORTER,
            "Company profile complete",
            "Company profile generated successfully",
        );

        Ok(StateUpdate {
            company_profile: Some(profile),
            ..StateUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use analyst_core::{Error, StatusEmitter};
    use analyst_llm::testing::ScriptedProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_requires_financial_info() {
        let stage = ProfilerStage::new(ModelGateway::new(
            Arc::new(ScriptedProvider::always("{}")),
            "test-model",
        ));
        let mut state = PipelineState::new("msg");
        state.ticker = Some("AAPL".into());

        let err = stage.run(&state, &RunContext::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::MissingState { ref stage, ref key } if stage == "financial_reporter" && key == "financial_info"
        ));
    }

    #[tokio::test]
    async fn test_profile_with_status_events() {
        let provider = Arc::new(ScriptedProvider::new(fixtures::scripted_reply));
        let stage = ProfilerStage::new(ModelGateway::new(provider.clone(), "test-model"));
        let mut state = PipelineState::new("msg");
        state.ticker = Some("AAPL".into());
        state.financial_info = Some("revenue 391B".into());

        let (emitter, mut rx) = StatusEmitter::channel();
        let ctx = RunContext::new().with_emitter(emitter);
        let update = stage.run(&state, &ctx).await.unwrap();

        assert!(update.company_profile.is_some());
        assert!(provider.calls()[0].user_text().contains("revenue 391B"));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.label.as_deref(), Some("Generating company profile"));
        assert_eq!(second.label.as_deref(), Some("Company profile complete"));
    }
}
