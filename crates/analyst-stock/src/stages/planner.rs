//! Intent and ticker extraction

use super::PLANNER;
use crate::model::PlannerOutput;
use crate::prompts::{self, system};
use crate::state::{PipelineState, StateUpdate};
use analyst_core::{Result, RunContext, Stage};
use analyst_llm::ModelGateway;
use async_trait::async_trait;
use tracing::info;

/// Maps the user's message to an intent and a ticker symbol
pub struct PlannerStage {
    gateway: ModelGateway,
}

impl PlannerStage {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Stage<PipelineState> for PlannerStage {
    fn name(&self) -> &str {
        PLANNER
    }

    async fn run(&self, state: &PipelineState, _ctx: &RunContext) -> Result<StateUpdate> {
        let user_prompt = prompts::planner_request(&state.user_message)?;
        let plan: PlannerOutput = self
            .gateway
            .invoke_structured(system::PLANNER, &user_prompt)
            .await?;

        let ticker = plan.ticker.trim().to_ascii_uppercase();
        info!(
            "Planner result: intent={}, ticker={ticker}, reasoning={}",
            plan.intent, plan.reasoning
        );

        Ok(StateUpdate {
            intent: Some(plan.intent),
            ticker: Some(ticker),
            reasoning: Some(plan.reasoning),
            ..StateUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::Error;
    use analyst_llm::testing::ScriptedProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ticker_is_normalized() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"intent": "stock_analysis", "ticker": " nvda ", "reasoning": "NVIDIA maps to NVDA"}"#,
        ));
        let stage = PlannerStage::new(ModelGateway::new(provider.clone(), "test-model"));

        let update = stage
            .run(&PipelineState::new("How is nvidia doing?"), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(update.ticker.as_deref(), Some("NVDA"));
        assert_eq!(update.intent.as_deref(), Some("stock_analysis"));
        assert!(update.financial_info.is_none());

        let calls = provider.calls();
        assert_eq!(calls[0].schema_name(), Some("planner_output"));
        assert!(calls[0].user_text().ends_with("How is nvidia doing?"));
    }

    #[tokio::test]
    async fn test_empty_ticker_fails() {
        let provider = Arc::new(ScriptedProvider::always(
            r#"{"intent": "general_question", "ticker": "", "reasoning": "no company"}"#,
        ));
        let stage = PlannerStage::new(ModelGateway::new(provider, "test-model"));

        let err = stage
            .run(&PipelineState::new("What is a stock?"), &RunContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(ref msg) if msg.contains("ticker")));
    }
}
