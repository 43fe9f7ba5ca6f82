//! API clients for financial data and web search

pub mod search;
pub mod yahoo;

pub use search::{DuckDuckGoClient, SearchHit};
pub use yahoo::{FinancialSnapshot, YahooFinanceClient};
