//! Prompt templates for the analysis stages
//!
//! - `system`: fixed system prompts
//! - `user`: minijinja templates filled from pipeline state

pub mod system;
pub mod user;

use crate::error::{Result, StockError};
use crate::model::{CompanyProfile, Persona, PersonaAnalysis};
use minijinja::Environment;
use serde_json::{Value, json};

/// A named minijinja template
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    name: &'static str,
    source: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Render with the given variables
    pub fn render(&self, vars: &Value) -> Result<String> {
        let env = Environment::new();
        let value = minijinja::Value::from_serialize(vars);

        env.render_str(self.source, value)
            .map_err(|e| StockError::PromptError {
                name: self.name.to_string(),
                detail: e.to_string(),
            })
    }
}

pub fn planner_request(user_message: &str) -> Result<String> {
    user::PLANNER_REQUEST.render(&json!({ "user_message": user_message }))
}

/// Persona generator request, showing only the first `context_chars` characters
pub fn persona_request(ticker: &str, financial_info: &str, context_chars: usize) -> Result<String> {
    let financial_context: String = financial_info.chars().take(context_chars).collect();
    user::PERSONA_REQUEST.render(&json!({
        "ticker": ticker,
        "financial_context": financial_context,
    }))
}

pub fn company_profile_request(ticker: &str, financial_info: &str) -> Result<String> {
    user::COMPANY_PROFILE_REQUEST.render(&json!({
        "ticker": ticker,
        "financial_info": financial_info,
    }))
}

/// System prompt that puts the model in the persona's shoes
pub fn persona_identity(persona: &Persona) -> Result<String> {
    let p = &persona.perspective;
    user::PERSONA_IDENTITY.render(&json!({
        "name": persona.name,
        "description": persona.description,
        "risk_appetite": p.risk_appetite,
        "incentive_accountability": p.incentive_accountability,
        "time_horizon": p.time_horizon,
        "values": persona.values_label(),
        "logical_reasoning_style": p.logical_reasoning_style,
        "analysis_approach": persona.analysis_approach,
    }))
}

pub fn analysis_request(
    ticker: &str,
    financial_info: &str,
    company_profile: Option<&CompanyProfile>,
) -> Result<String> {
    let profile = company_profile
        .map(serde_json::to_string_pretty)
        .transpose()?;

    user::ANALYSIS_REQUEST.render(&json!({
        "ticker": ticker,
        "financial_info": financial_info,
        "company_profile": profile,
    }))
}

pub fn report_request(
    ticker: &str,
    analyses: &[PersonaAnalysis],
    financial_info: &str,
) -> Result<String> {
    user::REPORT_REQUEST.render(&json!({
        "ticker": ticker,
        "analyses": format_analyses(analyses),
        "financial_info": financial_info,
    }))
}

/// Readable block of all persona analyses for the report writer
pub fn format_analyses(analyses: &[PersonaAnalysis]) -> String {
    analyses
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let summary = &a.executive_summary;
            let mut section = format!(
                "### Analyst {}: {}\n**Profit Outlook:** {}\n\n**Risk Assessment:** {}\n\n**Overall View:** {}",
                i + 1,
                a.persona_name,
                summary.profit_outlook,
                summary.risk_assessment,
                summary.overall_view,
            );
            for (label, value) in a.assessment.sections() {
                section.push_str(&format!("\n\n**{label}:** {value}"));
            }
            section
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecutiveSummary, PersonaPerspective, ValueOrientation};

    fn profile() -> CompanyProfile {
        CompanyProfile {
            business_model: "Hardware plus services".into(),
            what_they_sell_and_who_buys: "Phones to consumers".into(),
            how_they_make_money: "Device sales".into(),
            revenue_quality: "High".into(),
            cost_structure: "Outsourced manufacturing".into(),
            capital_intensity: "Low".into(),
            growth_drivers: "Services".into(),
            competitive_edge: "Ecosystem".into(),
        }
    }

    #[test]
    fn test_planner_request() {
        let prompt = planner_request("Tell me about Apple stock").unwrap();
        assert_eq!(
            prompt,
            "Extract the intent and stock ticker from this message:\n\nTell me about Apple stock"
        );
    }

    #[test]
    fn test_persona_request_truncates_context() {
        let info = "é".repeat(1500);
        let prompt = persona_request("AAPL", &info, 1000).unwrap();
        assert!(prompt.contains(&"é".repeat(1000)));
        assert!(!prompt.contains(&"é".repeat(1001)));
        assert!(prompt.contains("the stock AAPL."));
    }

    #[test]
    fn test_persona_identity_embeds_perspective() {
        let persona = Persona {
            name: "Steady Steward".into(),
            description: "Protects capital.".into(),
            perspective: PersonaPerspective {
                risk_appetite: "low".into(),
                incentive_accountability: "fiduciary duty".into(),
                time_horizon: "long-term".into(),
                value_orientation: vec![ValueOrientation::Security, ValueOrientation::Stability],
                logical_reasoning_style: "deductive".into(),
            },
            analysis_approach: "Balance sheet first".into(),
        };

        let prompt = persona_identity(&persona).unwrap();
        assert!(prompt.starts_with("You are Steady Steward: Protects capital."));
        assert!(prompt.contains("- Core values: security, stability"));
        assert!(prompt.contains("- Analysis approach: Balance sheet first"));
    }

    #[test]
    fn test_analysis_request_with_and_without_profile() {
        let with = analysis_request("AAPL", "data", Some(&profile())).unwrap();
        assert!(with.contains("\"competitive_edge\": \"Ecosystem\""));

        let without = analysis_request("AAPL", "data", None).unwrap();
        assert!(without.contains("Not available."));
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let prompt = company_profile_request("AAPL", "{{ ticker }} {% raw %}").unwrap();
        assert!(prompt.contains("{{ ticker }} {% raw %}"));
    }

    #[test]
    fn test_format_analyses() {
        let analysis = |name: &str| PersonaAnalysis {
            persona_name: name.into(),
            executive_summary: ExecutiveSummary {
                profit_outlook: "up".into(),
                risk_assessment: "low".into(),
                overall_view: "Buy".into(),
            },
            assessment: profile(),
        };

        let text = format_analyses(&[analysis("A"), analysis("B")]);
        assert!(text.starts_with("### Analyst 1: A\n**Profit Outlook:** up\n\n**Risk Assessment:** low"));
        assert!(text.contains("\n\n---\n\n### Analyst 2: B\n"));
        assert!(text.ends_with("**Competitive Edge:** Ecosystem"));

        let prompt = report_request("AAPL", &[analysis("A")], "raw data").unwrap();
        assert!(prompt.contains("--- PERSONA ANALYSES ---\n### Analyst 1: A"));
        assert!(prompt.contains("raw data\n--- END ORIGINAL FINANCIAL INFORMATION ---"));
    }
}
