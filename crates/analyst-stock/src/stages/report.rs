//! Final report stage

use super::GENERATE_REPORT;
use crate::prompts::{self, system};
use crate::state::{PipelineState, StateUpdate};
use analyst_core::{Result, RunContext, Stage};
use analyst_llm::{ModelGateway, strip_citation_markers, strip_tool_calls};
use async_trait::async_trait;
use tracing::{debug, info, warn};

const APPENDIX_HEADING: &str = "## 4. Appendix: Financial Information";

/// Synthesizes the persona analyses into a Markdown investment report
pub struct ReportStage {
    gateway: ModelGateway,
}

impl ReportStage {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Stage<PipelineState> for ReportStage {
    fn name(&self) -> &str {
        GENERATE_REPORT
    }

    async fn run(&self, state: &PipelineState, ctx: &RunContext) -> Result<StateUpdate> {
        let ticker = state.ticker(GENERATE_REPORT)?;
        let financial_info = state.financial_info(GENERATE_REPORT)?;
        let analyses = state.persona_analyses(GENERATE_REPORT)?;

        let user_prompt = prompts::report_request(ticker, analyses, financial_info)?;
        ctx.status(
            GENERATE_REPORT,
            "Writing final report",
            "Synthesizing all analyses into the investment report…",
        );

        let raw = self.gateway.invoke(system::REPORT_WRITER, &user_prompt).await?;
        let report = finalize_report(&raw, ticker, financial_info);

        if report.is_empty() {
            warn!("Model returned an empty report for {ticker}");
        } else {
            info!("Report generated: {} chars", report.len());
            debug!("Report preview: {}", report.chars().take(500).collect::<String>());
        }

        Ok(StateUpdate {
            report: Some(report),
            ..StateUpdate::default()
        })
    }
}

/// Strip model artifacts and make sure the title and appendix are present
///
/// An empty reply stays empty.
pub fn finalize_report(raw: &str, ticker: &str, financial_info: &str) -> String {
    let mut report = strip_citation_markers(&strip_tool_calls(raw));
    if report.is_empty() {
        return report;
    }

    let titled = report
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| {
            line.trim_start().starts_with('#')
                && line.to_ascii_uppercase().contains(&ticker.to_ascii_uppercase())
        });
    if !titled {
        report = format!("# Investment Report: {ticker}\n\n{report}");
    }

    let has_appendix = report.lines().any(|line| {
        line.trim_start().starts_with('#') && line.to_ascii_lowercase().contains("appendix")
    });
    if !has_appendix {
        report.push_str(&format!("\n\n{APPENDIX_HEADING}\n\n{financial_info}"));
    }
    report
}
