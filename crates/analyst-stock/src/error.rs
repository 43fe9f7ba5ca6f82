//! Error types for stock analysis operations

use thiserror::Error;

/// Stock analysis specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Web search failed
    #[error("Search error: {0}")]
    SearchError(String),

    /// Prompt template failed to render
    #[error("Prompt '{name}' failed to render: {detail}")]
    PromptError { name: String, detail: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

/// Convert StockError to analyst_core::Error
impl From<StockError> for analyst_core::Error {
    fn from(err: StockError) -> Self {
        match err {
            StockError::ConfigError(msg) => analyst_core::Error::Configuration(msg),
            StockError::PromptError { .. } => analyst_core::Error::Generic(err.to_string()),
            other => analyst_core::Error::DataSource(other.to_string()),
        }
    }
}
