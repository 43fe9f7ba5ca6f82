//! Command-line runner: one ticker in, one Markdown report out

use analyst_stock::{AnalysisPipeline, Recommendation};
use analyst_utils::{Settings, logging};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "analyst-cli")]
#[command(about = "Generate a multi-perspective investment report for a ticker", long_about = None)]
struct Args {
    /// Stock ticker, e.g. AAPL
    ticker: String,

    /// Output file (default: <TICKER>_<timestamp>_report.md)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn default_output_path(ticker: &str, now: NaiveDateTime) -> PathBuf {
    PathBuf::from(format!("{ticker}_{}_report.md", now.format("%Y%m%d_%H%M%S")))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let settings = Settings::load();
    let level = if args.verbose { "debug" } else { settings.log_level.as_str() };
    logging::init_tracing_with_level(level);

    let ticker = args.ticker.trim().to_uppercase();
    let pipeline =
        AnalysisPipeline::from_settings(&settings).context("Failed to build analysis pipeline")?;

    info!("Analyzing {ticker}");
    let state = pipeline
        .run(&format!("Analyze {ticker} stock"))
        .await
        .with_context(|| format!("Analysis of {ticker} failed"))?;
    debug!("Final state:\n{}", serde_json::to_string_pretty(&state)?);

    let report = match state.require_report() {
        Ok(report) => report,
        Err(e) => {
            error!("{e} for {ticker}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let path = args
        .output
        .unwrap_or_else(|| default_output_path(&ticker, Local::now().naive_local()));
    tokio::fs::write(&path, report)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Recommendation: {}", Recommendation::from_report(report));
    info!("Report written to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_output_path() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(14, 5, 7))
            .unwrap();
        assert_eq!(
            default_output_path("AAPL", now),
            PathBuf::from("AAPL_20240309_140507_report.md")
        );
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from(["analyst-cli", "msft", "-o", "out.md", "-v"]);
        assert_eq!(args.ticker, "msft");
        assert_eq!(args.output, Some(PathBuf::from("out.md")));
        assert!(args.verbose);

        let args = Args::parse_from(["analyst-cli", "TSLA"]);
        assert!(args.output.is_none());
        assert!(!args.verbose);
    }
}
