//! Per-run pipeline state
//!
//! Each key is written by exactly one stage. Stages return a [`StateUpdate`]
//! and the orchestrator merges it; writing a key twice is rejected.

use crate::model::{CompanyProfile, Persona, PersonaAnalysis};
use analyst_core::{Error, Result, State};
use serde::Serialize;

/// Accumulated state of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    pub user_message: String,
    pub intent: Option<String>,
    pub ticker: Option<String>,
    pub reasoning: Option<String>,
    pub financial_info: Option<String>,
    pub company_profile: Option<CompanyProfile>,
    pub personas: Option<Vec<Persona>>,
    pub persona_analyses: Option<Vec<PersonaAnalysis>>,
    pub report: Option<String>,
}

/// Keys produced by a single stage
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub intent: Option<String>,
    pub ticker: Option<String>,
    pub reasoning: Option<String>,
    pub financial_info: Option<String>,
    pub company_profile: Option<CompanyProfile>,
    pub personas: Option<Vec<Persona>>,
    pub persona_analyses: Option<Vec<PersonaAnalysis>>,
    pub report: Option<String>,
}

impl PipelineState {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Self::default()
        }
    }

    pub fn ticker(&self, stage: &str) -> Result<&str> {
        required(stage, "ticker", self.ticker.as_deref())
    }

    pub fn financial_info(&self, stage: &str) -> Result<&str> {
        required(stage, "financial_info", self.financial_info.as_deref())
    }

    pub fn personas(&self, stage: &str) -> Result<&[Persona]> {
        required(stage, "personas", self.personas.as_deref())
    }

    pub fn persona_analyses(&self, stage: &str) -> Result<&[PersonaAnalysis]> {
        required(stage, "persona_analyses", self.persona_analyses.as_deref())
    }

    /// Final report, empty when the run has not produced one
    pub fn report_text(&self) -> &str {
        self.report.as_deref().unwrap_or_default()
    }

    /// Final report, or [`Error::EmptyReport`] when it is blank
    pub fn require_report(&self) -> Result<&str> {
        let report = self.report_text();
        if report.trim().is_empty() {
            return Err(Error::EmptyReport);
        }
        Ok(report)
    }

    fn conflicts(&self, update: &StateUpdate) -> Option<&'static str> {
        let written = [
            ("intent", self.intent.is_some() && update.intent.is_some()),
            ("ticker", self.ticker.is_some() && update.ticker.is_some()),
            ("reasoning", self.reasoning.is_some() && update.reasoning.is_some()),
            (
                "financial_info",
                self.financial_info.is_some() && update.financial_info.is_some(),
            ),
            (
                "company_profile",
                self.company_profile.is_some() && update.company_profile.is_some(),
            ),
            ("personas", self.personas.is_some() && update.personas.is_some()),
            (
                "persona_analyses",
                self.persona_analyses.is_some() && update.persona_analyses.is_some(),
            ),
            ("report", self.report.is_some() && update.report.is_some()),
        ];
        written.into_iter().find(|(_, clash)| *clash).map(|(key, _)| key)
    }
}

impl State for PipelineState {
    type Update = StateUpdate;

    fn merge(&mut self, update: StateUpdate) -> Result<()> {
        if let Some(key) = self.conflicts(&update) {
            return Err(Error::StateConflict {
                key: key.to_string(),
            });
        }

        let StateUpdate {
            intent,
            ticker,
            reasoning,
            financial_info,
            company_profile,
            personas,
            persona_analyses,
            report,
        } = update;

        self.intent = self.intent.take().or(intent);
        self.ticker = self.ticker.take().or(ticker);
        self.reasoning = self.reasoning.take().or(reasoning);
        self.financial_info = self.financial_info.take().or(financial_info);
        self.company_profile = self.company_profile.take().or(company_profile);
        self.personas = self.personas.take().or(personas);
        self.persona_analyses = self.persona_analyses.take().or(persona_analyses);
        self.report = self.report.take().or(report);
        Ok(())
    }
}

fn required<'a, T: ?Sized>(stage: &str, key: &str, value: Option<&'a T>) -> Result<&'a T> {
    value.ok_or_else(|| Error::MissingState {
        stage: stage.to_string(),
        key: key.to_string(),
    })
}
