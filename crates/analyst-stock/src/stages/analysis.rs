//! Per-persona analysis stage

use super::ANALYSIS;
use crate::model::{Persona, PersonaAnalysis};
use crate::prompts;
use crate::state::{PipelineState, StateUpdate};
use analyst_core::{Result, RunContext, Stage};
use analyst_llm::ModelGateway;
use async_trait::async_trait;
use tracing::info;

/// Runs one structured analysis per persona, sequentially and in order
pub struct AnalysisStage {
    gateway: ModelGateway,
}

impl AnalysisStage {
    /// `gateway` should already carry the analysis output-token cap
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }

    async fn analyze(
        &self,
        persona: &Persona,
        ticker: &str,
        user_prompt: &str,
    ) -> Result<PersonaAnalysis> {
        let system_prompt = prompts::persona_identity(persona)?;
        let mut analysis: PersonaAnalysis = self
            .gateway
            .invoke_structured(&system_prompt, user_prompt)
            .await?;

        if analysis.persona_name != persona.name {
            info!(
                "[{ticker}] Model named the analysis '{}', keeping '{}'",
                analysis.persona_name, persona.name
            );
            analysis.persona_name.clone_from(&persona.name);
        }
        Ok(analysis)
    }
}

#[async_trait]
impl Stage<PipelineState> for AnalysisStage {
    fn name(&self) -> &str {
        ANALYSIS
    }

    async fn run(&self, state: &PipelineState, ctx: &RunContext) -> Result<StateUpdate> {
        let ticker = state.ticker(ANALYSIS)?;
        let financial_info = state.financial_info(ANALYSIS)?;
        let personas = state.personas(ANALYSIS)?;

        // Same request for every persona; only the system prompt differs.
        let user_prompt =
            prompts::analysis_request(ticker, financial_info, state.company_profile.as_ref())?;

        let total = personas.len();
        let mut analyses = Vec::with_capacity(total);
        for (i, persona) in personas.iter().enumerate() {
            info!("Running persona {}/{total}: {}", i + 1, persona.name);
            ctx.status(
                ANALYSIS,
                &format!("Analyzing as {}", persona.name),
                format!("Running persona {}/{total}…", i + 1),
            );

            analyses.push(self.analyze(persona, ticker, &user_prompt).await?);

            ctx.status(
                ANALYSIS,
                &format!("Completed: {}", persona.name),
                format!("Persona {}/{total} analysis done", i + 1),
            );
        }

        Ok(StateUpdate {
            persona_analyses: Some(analyses),
            ..StateUpdate::default()
        })
    }
}
