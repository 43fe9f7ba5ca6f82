//! Offline providers and canned model replies
//!
//! Lets the whole pipeline run without network access, for tests here and in
//! dependent crates (enable the `fixtures` feature).

use crate::api::{FinancialSnapshot, SearchHit};
use crate::collector::{DataCollector, FinancialDataProvider, SearchProvider};
use crate::config::StockConfig;
use crate::error::Result;
use crate::model::{CompanyProfile, ExecutiveSummary, PersonaAnalysis};
use crate::pipeline::AnalysisPipeline;
use analyst_llm::testing::ScriptedProvider;
use analyst_llm::{CompletionRequest, LLMError, ModelGateway};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

const KNOWN_COMPANIES: [(&str, &str); 6] = [
    ("apple", "AAPL"),
    ("tesla", "TSLA"),
    ("microsoft", "MSFT"),
    ("google", "GOOG"),
    ("alphabet", "GOOG"),
    ("amazon", "AMZN"),
];

/// Financial data provider returning a small fixed snapshot
pub struct StaticFinancialData;

#[async_trait]
impl FinancialDataProvider for StaticFinancialData {
    async fn snapshot(&self, ticker: &str) -> Result<FinancialSnapshot> {
        let mut snapshot = FinancialSnapshot::default();
        snapshot.info.insert("shortName".into(), json!(format!("{ticker} Inc.")));
        snapshot.info.insert("marketCap".into(), json!(3_500_000_000_000_i64));
        snapshot.info.insert("trailingPE".into(), json!(33.1));
        snapshot.income_statement.insert(
            "2024-09-30".into(),
            json!({"totalRevenue": 391_035_000_000_i64, "netIncome": 93_736_000_000_i64}),
        );
        Ok(snapshot)
    }
}

/// Search provider answering every query with one hit
pub struct StaticSearch;

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        Ok(vec![SearchHit {
            title: format!("Result for {query}"),
            link: "https://example.com/article".to_string(),
            snippet: "Analysts expect steady results.".to_string(),
        }])
    }
}

/// Canned reply for each stage, keyed by the requested schema
pub fn scripted_reply(request: &CompletionRequest) -> analyst_llm::Result<String> {
    let user = request.user_text();
    let reply = match request.schema_name() {
        Some("planner_output") => planner_reply(user),
        Some("persona_collection") => persona_collection(),
        Some("company_profile") => company_profile(),
        Some("persona_analysis") => json!(persona_analysis("Model Chosen Name")),
        Some(other) => {
            return Err(LLMError::UnexpectedResponse(format!("no scripted reply for '{other}'")));
        }
        None => return Ok(report_reply(user)),
    };
    Ok(reply.to_string())
}

/// Scripted provider whose replies for `schema` fail
pub fn failing_at(schema: &'static str) -> ScriptedProvider {
    ScriptedProvider::new(move |request| {
        if request.schema_name() == Some(schema) {
            Err(LLMError::RequestFailed(format!("scripted failure for {schema}")))
        } else {
            scripted_reply(request)
        }
    })
}

/// Pipeline over the static providers and the given scripted model
pub fn pipeline_with(provider: Arc<ScriptedProvider>, config: &StockConfig) -> analyst_core::Result<AnalysisPipeline> {
    let gateway = ModelGateway::new(provider, "scripted-model");
    let collector = DataCollector::new(Arc::new(StaticFinancialData), Arc::new(StaticSearch), config);
    AnalysisPipeline::new(gateway, collector, config)
}

/// Fully offline pipeline plus the provider recording its model calls
pub fn offline_pipeline(
    config: &StockConfig,
) -> analyst_core::Result<(Arc<ScriptedProvider>, AnalysisPipeline)> {
    let provider = Arc::new(ScriptedProvider::new(scripted_reply));
    let pipeline = pipeline_with(provider.clone(), config)?;
    Ok((provider, pipeline))
}

pub fn persona_collection() -> Value {
    json!({
        "personas": [
            persona(
                "Steady Steward",
                "A conservative value investor focused on downside protection.",
                "low",
                "long-term",
                &["security", "stability"],
                "Start from the balance sheet and margin of safety."
            ),
            persona(
                "Growth Pioneer",
                "An upside-seeking analyst betting on new markets.",
                "high",
                "long-term",
                &["innovation", "efficiency"],
                "Project revenue expansion and optionality."
            ),
            persona(
                "Sector Strategist",
                "A macro strategist weighing industry cycles.",
                "moderate",
                "short-term",
                &["stability", "fairness"],
                "Place the company in its industry cycle."
            ),
            persona(
                "Quant Auditor",
                "A metrics-driven analyst who trusts only the numbers.",
                "moderate",
                "reversibility-focused",
                &["efficiency"],
                "Score ratios against historical ranges."
            ),
        ]
    })
}

pub fn company_profile() -> Value {
    json!({
        "business_model": "Premium hardware with an attached services ecosystem.",
        "what_they_sell_and_who_buys": "Phones, computers and subscriptions sold to consumers and enterprises.",
        "how_they_make_money": "Device margins plus recurring services revenue.",
        "revenue_quality": "Large recurring services share; diversified customers.",
        "cost_structure": "Outsourced manufacturing and heavy R&D.",
        "capital_intensity": "Capex well below operating cash flow.",
        "growth_drivers": "Services, wearables and emerging markets.",
        "competitive_edge": "Brand and ecosystem lock-in."
    })
}

pub fn persona_analysis(name: &str) -> PersonaAnalysis {
    PersonaAnalysis {
        persona_name: name.to_string(),
        executive_summary: ExecutiveSummary {
            profit_outlook: "Profits should grow at a mid-single-digit pace.".into(),
            risk_assessment: "Regulatory pressure on the app store.".into(),
            overall_view: "Hold at the current valuation.".into(),
        },
        assessment: CompanyProfile {
            business_model: "Hardware plus services.".into(),
            what_they_sell_and_who_buys: "Devices to consumers.".into(),
            how_they_make_money: "Device margins and subscriptions.".into(),
            revenue_quality: "High.".into(),
            cost_structure: "Variable manufacturing costs.".into(),
            capital_intensity: "Low.".into(),
            growth_drivers: "Services.".into(),
            competitive_edge: "Ecosystem.".into(),
        },
    }
}

fn persona(
    name: &str,
    description: &str,
    risk: &str,
    horizon: &str,
    values: &[&str],
    approach: &str,
) -> Value {
    json!({
        "name": name,
        "description": description,
        "perspective": {
            "risk_appetite": risk,
            "incentive_accountability": "Accountable to long-only clients.",
            "time_horizon": horizon,
            "value_orientation": values,
            "logical_reasoning_style": "Evidence-weighted."
        },
        "analysis_approach": approach
    })
}

fn planner_reply(user: &str) -> Value {
    let lower = user.to_lowercase();
    let ticker = KNOWN_COMPANIES
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, ticker)| (*ticker).to_string())
        .or_else(|| {
            user.split(|c: char| !c.is_ascii_alphanumeric())
                .find(|w| (2..=5).contains(&w.len()) && w.chars().all(|c| c.is_ascii_uppercase()))
                .map(ToString::to_string)
        })
        .unwrap_or_default();

    let intent = if lower.contains("compare") {
        "comparison"
    } else {
        "stock_analysis"
    };

    json!({
        "intent": intent,
        "ticker": ticker,
        "reasoning": format!("The message refers to {ticker}.")
    })
}

fn report_reply(user: &str) -> String {
    let ticker = user
        .split("investment report for ")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .unwrap_or("UNKNOWN");

    format!(
        "<tool_call>{{\"name\": \"web_search\", \"arguments\": {{\"query\": \"{ticker}\"}}}}</tool_call>\n\
# Investment Report: {ticker}\n\n\
## 1. Recommendation\n**Hold** [1]. The analysts agree the business is strong but fully valued.\n\n\
## 2. Executive Summary\n- Durable ecosystem [2]\n- Valuation leaves little margin of safety\n\n\
## 3. Analyst Perspectives\n### Steady Steward\n- **Profit Outlook:** Stable\n- **Risk Assessment:** Valuation\n- **Overall View:** Hold\n\n---\n\n\
### Growth Pioneer\n- **Profit Outlook:** Rising\n- **Risk Assessment:** Execution\n- **Overall View:** Buy\n\n\
## 4. Appendix: Financial Information\n> See the collected data."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PersonaCollection, PlannerOutput};
    use analyst_llm::StructuredOutput;
    use analyst_llm::structured::parse_structured;

    #[test]
    fn test_fixture_replies_are_valid_records() {
        let collection: PersonaCollection =
            parse_structured(&persona_collection().to_string()).unwrap();
        assert!(collection.validate().is_ok());

        let plan: PlannerOutput = parse_structured(&planner_reply("Analyze TSLA stock").to_string()).unwrap();
        assert_eq!(plan.ticker, "TSLA");
        let plan: PlannerOutput = parse_structured(&planner_reply("Tell me about Apple stock").to_string()).unwrap();
        assert_eq!(plan.ticker, "AAPL");
    }
}
