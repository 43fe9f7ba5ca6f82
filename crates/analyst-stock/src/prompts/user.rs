//! Templated prompts, rendered with minijinja

use super::PromptTemplate;

/// Planner user message
pub const PLANNER_REQUEST: PromptTemplate = PromptTemplate::new(
    "planner.request",
    "Extract the intent and stock ticker from this message:\n\n{{ user_message }}",
);

/// Persona generator user message
pub const PERSONA_REQUEST: PromptTemplate = PromptTemplate::new(
    "persona.request",
    r"Generate exactly 4 diverse analytical personas to analyze the stock {{ ticker }}.

Here is a brief summary of the company's financial profile for context:
{{ financial_context }}

Create 4 personas that will each analyze this stock's future profit potential and risk from very different angles.
Each persona should have distinct characteristics across risk appetite, accountability, time horizon, value orientation, and reasoning style.",
);

/// Company profile user message
pub const COMPANY_PROFILE_REQUEST: PromptTemplate = PromptTemplate::new(
    "profile.request",
    r"Build a factual company profile for {{ ticker }} using only the financial information below.

--- FINANCIAL INFORMATION ---
{{ financial_info }}
--- END FINANCIAL INFORMATION ---

Fill every field of the profile:
- business_model: how the company creates and captures value
- what_they_sell_and_who_buys: main products and services, and who the customers are
- how_they_make_money: revenue streams, pricing and segment mix
- revenue_quality: recurring vs non-recurring revenue, customer concentration, visibility
- cost_structure: main cost drivers, gross and operating margin trends
- capital_intensity: capital expenditures relative to operating cash flow
- growth_drivers: what is expected to drive future growth
- competitive_edge: moat, market share and position versus competitors

Cite specific figures where the data provides them. If the data does not cover a field, say so briefly.",
);

/// Persona identity, used as the analysis system prompt
pub const PERSONA_IDENTITY: PromptTemplate = PromptTemplate::new(
    "analysis.persona",
    r"You are {{ name }}: {{ description }}

Your analytical profile:
- Risk appetite: {{ risk_appetite }}
- Accountability orientation: {{ incentive_accountability }}
- Time horizon: {{ time_horizon }}
- Core values: {{ values }}
- Reasoning style: {{ logical_reasoning_style }}
- Analysis approach: {{ analysis_approach }}

Stay fully in character. Every judgment you make must reflect this persona's worldview, risk tolerance, and reasoning style.
Base your analysis EXCLUSIVELY on the financial information provided. Do not request or assume any external data.",
);

/// Persona analysis user message
pub const ANALYSIS_REQUEST: PromptTemplate = PromptTemplate::new(
    "analysis.request",
    r"Analyze {{ ticker }} from your perspective, focusing on its future profit potential and risk.

--- COMPANY PROFILE ---
{% if company_profile %}{{ company_profile }}{% else %}Not available. Derive the business picture from the financial information.{% endif %}
--- END COMPANY PROFILE ---

--- FINANCIAL INFORMATION ---
{{ financial_info }}
--- END FINANCIAL INFORMATION ---

Return your analysis with:
- executive_summary: profit_outlook, risk_assessment and overall_view, written in your own voice
- your assessment of business_model, what_they_sell_and_who_buys, how_they_make_money, revenue_quality, cost_structure, capital_intensity, growth_drivers and competitive_edge

Judge each dimension through your risk appetite, time horizon and values. Reference specific data points.",
);

/// Report user message
pub const REPORT_REQUEST: PromptTemplate = PromptTemplate::new(
    "report.request",
    r"Generate a comprehensive investment report for {{ ticker }}.

--- PERSONA ANALYSES ---
{{ analyses }}
--- END PERSONA ANALYSES ---

--- ORIGINAL FINANCIAL INFORMATION ---
{{ financial_info }}
--- END ORIGINAL FINANCIAL INFORMATION ---

Follow the required report structure exactly:
1. Recommendation (with clear Buy/Hold/Sell/Avoid stance)
2. Executive Summary
3. Each persona's analysis (preserve their individual views)
4. Appendix with the original financial information
",
);
