//! Pipeline stages
//!
//! Each stage reads what earlier stages wrote, makes its model or data calls
//! and returns the keys it owns as a [`StateUpdate`](crate::state::StateUpdate).

pub mod analysis;
pub mod persona;
pub mod planner;
pub mod profiler;
pub mod report;
pub mod stock_info;

pub use analysis::AnalysisStage;
pub use persona::PersonaStage;
pub use planner::PlannerStage;
pub use profiler::ProfilerStage;
pub use report::ReportStage;
pub use stock_info::StockInfoStage;

pub const PLANNER: &str = "planner";
pub const STOCK_INFO: &str = "stock_info";
pub const FINANCIAL_REPORTER: &str = "financial_reporter";
pub const GENERATE_PERSONAS: &str = "generate_personas";
pub const ANALYSIS: &str = "analysis";
pub const GENERATE_REPORT: &str = "generate_report";

/// Human-readable label shown when a stage completes
pub fn node_label(node: &str) -> &'static str {
    match node {
        PLANNER => "Understanding your request",
        STOCK_INFO => "Gathering financial data",
        FINANCIAL_REPORTER => "Building company profile",
        GENERATE_PERSONAS => "Creating analyst personas",
        ANALYSIS => "Running multi-perspective analysis",
        GENERATE_REPORT => "Writing final report",
        _ => "Processing",
    }
}
