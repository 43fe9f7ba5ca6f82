//! Financial data collection
//!
//! Gathers structured data and web search results for a ticker into a single
//! Markdown document. Provider failures are retried, then degraded; collection
//! itself never fails.

use crate::api::{FinancialSnapshot, SearchHit};
use crate::config::StockConfig;
use crate::error::Result;
use analyst_core::{RetryPolicy, RunContext};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Node name used for collector status events
pub const NODE: &str = "stock_info";

/// Search queries run for every ticker, `{ticker}` substituted
pub const SEARCH_QUERIES: [&str; 13] = [
    "{ticker} business model revenue streams products and services",
    "{ticker} financial results revenue earnings margins latest quarterly annual",
    "{ticker} competitive advantage moat market position industry",
    "{ticker} growth drivers risks challenges outlook",
    "{ticker} financial statements balance sheet income statement cash flow statement",
    "{ticker} revenue by segment and geography",
    "{ticker} recurring vs non-recurring revenue split, and customer concentration",
    "{ticker} cost structure and cost drivers",
    "{ticker} capital intensity and capital expenditures",
    "{ticker} financial health and financial metrics",
    "{ticker} gross operating margin trends",
    "{ticker} annual capital expenditures vs operating cash flow",
    "{ticker} market share vs competitors",
];

/// Source of structured financial data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    async fn snapshot(&self, ticker: &str) -> Result<FinancialSnapshot>;
}

/// Web search backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

/// Builds the financial information document for a ticker
#[derive(Clone)]
pub struct DataCollector {
    financial: Arc<dyn FinancialDataProvider>,
    search: Arc<dyn SearchProvider>,
    retry: RetryPolicy,
    max_results: usize,
}

impl DataCollector {
    pub fn new(
        financial: Arc<dyn FinancialDataProvider>,
        search: Arc<dyn SearchProvider>,
        config: &StockConfig,
    ) -> Self {
        Self {
            financial,
            search,
            retry: config.retry_policy(),
            max_results: config.search_max_results,
        }
    }

    /// Collect structured data and search results into one document
    pub async fn collect(&self, ticker: &str, ctx: &RunContext) -> String {
        ctx.status(
            NODE,
            "Fetching financial data",
            format!("Loading financial statements for {ticker}"),
        );
        let snapshot = self.fetch_snapshot(ticker).await;

        let total = SEARCH_QUERIES.len();
        let mut searches = Vec::with_capacity(total);
        for (i, template) in SEARCH_QUERIES.iter().enumerate() {
            let query = template.replace("{ticker}", ticker);
            ctx.status(
                NODE,
                &format!("Searching ({}/{total})", i + 1),
                query.chars().take(80).collect::<String>(),
            );
            let result = self.run_search(&query).await;
            searches.push(format!("### Search: {query}\n{result}"));
        }

        let document = format!(
            "{}\n## Part B: Web Search Results\n{}",
            snapshot.render(),
            searches.join("\n\n")
        );
        info!(
            "Gathered {} chars for {ticker} (structured data + {total} searches)",
            document.len()
        );
        document
    }

    async fn fetch_snapshot(&self, ticker: &str) -> FinancialSnapshot {
        let fetched = self
            .retry
            .execute("financial_snapshot", || self.financial.snapshot(ticker), |_| true)
            .await;

        fetched.unwrap_or_else(|e| {
            warn!("Structured data unavailable for {ticker}, continuing without it: {e}");
            FinancialSnapshot::default()
        })
    }

    async fn run_search(&self, query: &str) -> String {
        let searched = self
            .retry
            .execute("web_search", || self.search.search(query, self.max_results), |_| true)
            .await;

        match searched {
            Ok(hits) => format_hits(&hits),
            Err(e) => format!("Search failed: {e}"),
        }
    }
}

/// Render search hits, `No results found.` when empty
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    hits.iter()
        .map(|h| format!("**{}**\n{}\n{}", h.title, h.link, h.snippet))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StockError;
    use analyst_core::{EventKind, StatusEmitter};
    use serde_json::json;
    use std::time::Duration;

    fn fast_config(max_retries: u32) -> StockConfig {
        StockConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_base(Duration::from_millis(1))
            .retry_jitter(Duration::ZERO)
            .build()
            .unwrap()
    }

    fn hit(title: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            link: format!("https://example.com/{title}"),
            snippet: "snippet".to_string(),
        }
    }

    #[test]
    fn test_format_hits() {
        assert_eq!(format_hits(&[]), "No results found.");
        assert_eq!(
            format_hits(&[hit("a"), hit("b")]),
            "**a**\nhttps://example.com/a\nsnippet\n\n---\n\n**b**\nhttps://example.com/b\nsnippet"
        );
    }

    #[tokio::test]
    async fn test_failing_search_degrades_after_exact_attempts() {
        let mut financial = MockFinancialDataProvider::new();
        financial.expect_snapshot().returning(|_| Ok(FinancialSnapshot::default()));

        let mut search = MockSearchProvider::new();
        search
            .expect_search()
            .times(SEARCH_QUERIES.len() * 3)
            .returning(|_, _| Err(StockError::SearchError("rate limited".to_string())));

        let collector = DataCollector::new(Arc::new(financial), Arc::new(search), &fast_config(3));
        let doc = collector.collect("AAPL", &RunContext::new()).await;

        assert!(doc.contains(
            "### Search: AAPL business model revenue streams products and services\nSearch failed: Search error: rate limited"
        ));
        assert_eq!(doc.matches("Search failed: ").count(), SEARCH_QUERIES.len());
    }

    #[tokio::test]
    async fn test_document_layout_and_events() {
        let mut financial = MockFinancialDataProvider::new();
        financial.expect_snapshot().times(1).returning(|ticker| {
            let mut snapshot = FinancialSnapshot::default();
            snapshot.info.insert("shortName".into(), json!(format!("{ticker} Corp")));
            Ok(snapshot)
        });

        let mut search = MockSearchProvider::new();
        search
            .expect_search()
            .withf(|_, max| *max == 5)
            .returning(|query, _| {
                if query.contains("moat") {
                    Ok(vec![])
                } else {
                    Ok(vec![hit("news")])
                }
            });

        let (emitter, mut rx) = StatusEmitter::channel();
        let ctx = RunContext::new().with_emitter(emitter);
        let collector = DataCollector::new(Arc::new(financial), Arc::new(search), &fast_config(2));
        let doc = collector.collect("MSFT", &ctx).await;

        assert!(doc.starts_with("## Part A: Yahoo Finance Structured Data\n### Company Info\n"));
        assert!(doc.contains("\"shortName\": \"MSFT Corp\""));
        assert!(doc.contains("\n## Part B: Web Search Results\n### Search: MSFT business model"));
        assert!(doc.contains("competitive advantage moat market position industry\nNo results found.\n\n### Search:"));

        drop(ctx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 1 + SEARCH_QUERIES.len());
        assert!(events.iter().all(|e| e.kind == EventKind::Status));
        assert_eq!(events[0].message.as_deref(), Some("Loading financial statements for MSFT"));
        assert_eq!(events[1].label.as_deref(), Some("Searching (1/13)"));
        assert!(events[5].message.as_ref().unwrap().chars().count() <= 80);
    }

    #[tokio::test]
    async fn test_structured_failure_degrades_to_empty() {
        let mut financial = MockFinancialDataProvider::new();
        financial
            .expect_snapshot()
            .times(2)
            .returning(|_| Err(StockError::YahooFinanceError("HTTP error: 401".into())));

        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|_, _| Ok(vec![]));

        let collector = DataCollector::new(Arc::new(financial), Arc::new(search), &fast_config(2));
        let doc = collector.collect("AAPL", &RunContext::new()).await;

        assert!(doc.contains("### Company Info\n{}"));
        assert_eq!(doc.matches("No results found.").count(), SEARCH_QUERIES.len());
    }
}
