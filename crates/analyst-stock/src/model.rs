//! Domain records exchanged between stages
//!
//! Every record that a stage requests from the model implements
//! [`StructuredOutput`], carrying its JSON schema and the validation rules the
//! schema cannot express.

use analyst_llm::StructuredOutput;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

/// Number of personas generated per run
pub const PERSONA_COUNT: usize = 4;

/// HTTP request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub user_message: String,
}

/// Planner output: what the user wants and which ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerOutput {
    pub intent: String,
    pub ticker: String,
    pub reasoning: String,
}

impl StructuredOutput for PlannerOutput {
    const NAME: &'static str = "planner_output";

    fn schema() -> Value {
        object_schema(
            &[
                ("intent", string("User intent, e.g. stock_analysis, comparison, general_question")),
                ("ticker", string("Uppercase stock ticker symbol")),
                ("reasoning", string("Short explanation of how the ticker was identified")),
            ],
        )
    }

    fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("ticker must not be empty".to_string());
        }
        Ok(())
    }
}

/// Value labels a persona can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueOrientation {
    #[serde(alias = "Efficiency")]
    Efficiency,
    #[serde(alias = "Fairness")]
    Fairness,
    #[serde(alias = "Innovation")]
    Innovation,
    #[serde(alias = "Security")]
    Security,
    #[serde(alias = "Stability")]
    Stability,
}

impl ValueOrientation {
    pub const ALL: [ValueOrientation; 5] = [
        ValueOrientation::Efficiency,
        ValueOrientation::Fairness,
        ValueOrientation::Innovation,
        ValueOrientation::Security,
        ValueOrientation::Stability,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueOrientation::Efficiency => "efficiency",
            ValueOrientation::Fairness => "fairness",
            ValueOrientation::Innovation => "innovation",
            ValueOrientation::Security => "security",
            ValueOrientation::Stability => "stability",
        }
    }
}

impl fmt::Display for ValueOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five axes that distinguish personas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaPerspective {
    pub risk_appetite: String,
    pub incentive_accountability: String,
    pub time_horizon: String,
    pub value_orientation: Vec<ValueOrientation>,
    pub logical_reasoning_style: String,
}

/// A named analytical viewpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub description: String,
    pub perspective: PersonaPerspective,
    pub analysis_approach: String,
}

impl Persona {
    /// Comma-separated value labels
    pub fn values_label(&self) -> String {
        self.perspective
            .value_orientation
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn check(&self) -> Result<(), String> {
        let required = [
            ("name", &self.name),
            ("description", &self.description),
            ("analysis_approach", &self.analysis_approach),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("persona '{}' has an empty {field}", self.name));
            }
        }
        if self.perspective.value_orientation.is_empty() {
            return Err(format!("persona '{}' has no value_orientation", self.name));
        }
        Ok(())
    }
}

/// Persona generator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaCollection {
    pub personas: Vec<Persona>,
}

impl StructuredOutput for PersonaCollection {
    const NAME: &'static str = "persona_collection";

    fn schema() -> Value {
        let values: Vec<&str> = ValueOrientation::ALL.iter().map(|v| v.as_str()).collect();
        let perspective = object_schema(&[
            ("risk_appetite", string("low, moderate or high, with a short qualifier")),
            ("incentive_accountability", string("Incentive structure and accountability orientation")),
            ("time_horizon", string("short-term, long-term, or reversibility-focused")),
            (
                "value_orientation",
                json!({
                    "type": "array",
                    "items": {"type": "string", "enum": values},
                    "minItems": 1
                }),
            ),
            ("logical_reasoning_style", string("Reasoning methodology")),
        ]);
        let persona = object_schema(&[
            ("name", string("Persona name")),
            ("description", string("One or two sentences describing the persona")),
            ("perspective", perspective),
            ("analysis_approach", string("How this persona analyzes a stock")),
        ]);

        object_schema(&[(
            "personas",
            json!({
                "type": "array",
                "items": persona,
                "minItems": PERSONA_COUNT,
                "maxItems": PERSONA_COUNT
            }),
        )])
    }

    fn validate(&self) -> Result<(), String> {
        if self.personas.len() != PERSONA_COUNT {
            return Err(format!(
                "expected exactly {PERSONA_COUNT} personas, got {}",
                self.personas.len()
            ));
        }

        let mut names = std::collections::HashSet::new();
        for persona in &self.personas {
            persona.check()?;
            if !names.insert(persona.name.trim().to_lowercase()) {
                warn!("Persona name '{}' repeats an earlier persona", persona.name);
            }
        }
        Ok(())
    }
}

/// Factual company summary, also the per-persona assessment dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub business_model: String,
    pub what_they_sell_and_who_buys: String,
    pub how_they_make_money: String,
    pub revenue_quality: String,
    pub cost_structure: String,
    pub capital_intensity: String,
    pub growth_drivers: String,
    pub competitive_edge: String,
}

impl CompanyProfile {
    const FIELDS: [(&'static str, &'static str); 8] = [
        ("business_model", "How the company creates and captures value"),
        ("what_they_sell_and_who_buys", "Products and services, and the customers buying them"),
        ("how_they_make_money", "Revenue streams and pricing"),
        ("revenue_quality", "Recurring vs one-off revenue, concentration, visibility"),
        ("cost_structure", "Main cost drivers and operating leverage"),
        ("capital_intensity", "Capital expenditure needs relative to cash flow"),
        ("growth_drivers", "What will drive future growth"),
        ("competitive_edge", "Moat and market position versus competitors"),
    ];

    /// Label/value pairs in display order
    pub fn sections(&self) -> [(&'static str, &str); 8] {
        [
            ("Business Model", &self.business_model),
            ("What They Sell and Who Buys", &self.what_they_sell_and_who_buys),
            ("How They Make Money", &self.how_they_make_money),
            ("Revenue Quality", &self.revenue_quality),
            ("Cost Structure", &self.cost_structure),
            ("Capital Intensity", &self.capital_intensity),
            ("Growth Drivers", &self.growth_drivers),
            ("Competitive Edge", &self.competitive_edge),
        ]
    }

    fn properties() -> Vec<(&'static str, Value)> {
        Self::FIELDS.iter().map(|(name, desc)| (*name, string(desc))).collect()
    }
}

impl StructuredOutput for CompanyProfile {
    const NAME: &'static str = "company_profile";

    fn schema() -> Value {
        object_schema(&Self::properties())
    }
}

/// Headline view of one persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub profit_outlook: String,
    pub risk_assessment: String,
    pub overall_view: String,
}

/// One persona's structured analysis of the stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaAnalysis {
    pub persona_name: String,
    pub executive_summary: ExecutiveSummary,
    #[serde(flatten)]
    pub assessment: CompanyProfile,
}

impl StructuredOutput for PersonaAnalysis {
    const NAME: &'static str = "persona_analysis";

    fn schema() -> Value {
        let summary = object_schema(&[
            ("profit_outlook", string("View on future profitability")),
            ("risk_assessment", string("Key risk concerns")),
            ("overall_view", string("Investment stance and reasoning")),
        ]);

        let mut properties = vec![
            ("persona_name", string("Name of the persona writing this analysis")),
            ("executive_summary", summary),
        ];
        properties.extend(CompanyProfile::properties());
        object_schema(&properties)
    }

    fn validate(&self) -> Result<(), String> {
        let summary = &self.executive_summary;
        if summary.overall_view.trim().is_empty() {
            return Err("executive_summary.overall_view must not be empty".to_string());
        }
        Ok(())
    }
}

/// Investment stance stated in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
    Avoid,
}

static RECOMMENDATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*(buy|hold|sell|avoid)\*\*").expect("recommendation pattern")
});

impl Recommendation {
    /// First bold Buy/Hold/Sell/Avoid marker in a report, `Hold` if none
    pub fn from_report(report: &str) -> Self {
        RECOMMENDATION
            .captures(report)
            .and_then(|caps| caps.get(1))
            .map_or(Recommendation::Hold, |m| {
                match m.as_str().to_ascii_lowercase().as_str() {
                    "buy" => Recommendation::Buy,
                    "sell" => Recommendation::Sell,
                    "avoid" => Recommendation::Avoid,
                    _ => Recommendation::Hold,
                }
            })
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
            Recommendation::Avoid => "Avoid",
        };
        f.write_str(label)
    }
}

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

// Strict mode wants every property required and no extras.
fn object_schema(properties: &[(&str, Value)]) -> Value {
    let props: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, schema)| ((*name).to_string(), schema.clone()))
        .collect();
    let required: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();

    json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": false
    })
}
