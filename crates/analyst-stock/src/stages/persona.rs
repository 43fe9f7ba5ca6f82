//! Persona generation stage

use super::GENERATE_PERSONAS;
use crate::model::PersonaCollection;
use crate::prompts::{self, system};
use crate::state::{PipelineState, StateUpdate};
use analyst_core::{Result, RunContext, Stage};
use analyst_llm::ModelGateway;
use async_trait::async_trait;
use tracing::info;

/// Generates four contrasting analyst personas for the ticker
pub struct PersonaStage {
    gateway: ModelGateway,
    context_chars: usize,
}

impl PersonaStage {
    pub fn new(gateway: ModelGateway, context_chars: usize) -> Self {
        Self {
            gateway,
            context_chars,
        }
    }
}

#[async_trait]
impl Stage<PipelineState> for PersonaStage {
    fn name(&self) -> &str {
        GENERATE_PERSONAS
    }

    async fn run(&self, state: &PipelineState, _ctx: &RunContext) -> Result<StateUpdate> {
        let ticker = state.ticker(GENERATE_PERSONAS)?;
        let financial_info = state.financial_info(GENERATE_PERSONAS)?;

        let user_prompt = prompts::persona_request(ticker, financial_info, self.context_chars)?;
        let collection: PersonaCollection = self
            .gateway
            .invoke_structured(system::PERSONA_GENERATOR, &user_prompt)
            .await?;

        for (i, p) in collection.personas.iter().enumerate() {
            info!(
                "Persona {}: {} (risk={}, horizon={}, values={})",
                i + 1,
                p.name,
                p.perspective.risk_appetite,
                p.perspective.time_horizon,
                p.values_label()
            );
        }

        Ok(StateUpdate {
            personas: Some(collection.personas),
            ..StateUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::model::PERSONA_COUNT;
    use analyst_core::Error;
    use analyst_llm::testing::ScriptedProvider;
    use serde_json::json;
    use std::sync::Arc;

    fn ready_state() -> PipelineState {
        let mut state = PipelineState::new("msg");
        state.ticker = Some("AAPL".into());
        state.financial_info = Some("x".repeat(5000));
        state
    }

    #[tokio::test]
    async fn test_generates_four_personas_from_truncated_context() {
        let provider = Arc::new(ScriptedProvider::new(fixtures::scripted_reply));
        let stage = PersonaStage::new(ModelGateway::new(provider.clone(), "test-model"), 1000);

        let update = stage.run(&ready_state(), &RunContext::new()).await.unwrap();
        let personas = update.personas.unwrap();
        assert_eq!(personas.len(), PERSONA_COUNT);
        assert!(personas.iter().all(|p| !p.perspective.value_orientation.is_empty()));

        let prompt = provider.calls()[0].user_text().to_string();
        assert!(prompt.contains(&"x".repeat(1000)));
        assert!(!prompt.contains(&"x".repeat(1001)));
    }

    #[tokio::test]
    async fn test_wrong_persona_count_fails() {
        let mut collection = fixtures::persona_collection();
        collection["personas"].as_array_mut().unwrap().truncate(3);
        let provider = Arc::new(ScriptedProvider::always(collection.to_string()));
        let stage = PersonaStage::new(ModelGateway::new(provider, "test-model"), 1000);

        let err = stage.run(&ready_state(), &RunContext::new()).await.unwrap_err();
        assert!(matches!(err, Error::Llm(ref msg) if msg.contains("exactly 4")));
    }

    #[tokio::test]
    async fn test_unknown_value_label_fails() {
        let mut collection = fixtures::persona_collection();
        collection["personas"][0]["perspective"]["value_orientation"] = json!(["greed"]);
        let provider = Arc::new(ScriptedProvider::always(collection.to_string()));
        let stage = PersonaStage::new(ModelGateway::new(provider, "test-model"), 1000);

        assert!(stage.run(&ready_state(), &RunContext::new()).await.is_err());
    }
}
