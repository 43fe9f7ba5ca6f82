//! Error types for analyst-core

use thiserror::Error;

/// Result type alias for analyst-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration, fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stage returned an error; the run is aborted
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    /// A stage read a state key that no upstream stage has written
    #[error("Stage '{stage}' requires '{key}' but it has not been produced yet")]
    MissingState { stage: String, key: String },

    /// A state key was written twice
    #[error("State key '{key}' was already written")]
    StateConflict { key: String },

    /// The run exceeded its step ceiling
    #[error("Step limit of {limit} exceeded")]
    StepLimitExceeded { limit: usize },

    /// Language model call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// Financial data or search provider failed
    #[error("Data source error: {0}")]
    DataSource(String),

    /// The pipeline completed but produced no report text
    #[error("Pipeline produced an empty report")]
    EmptyReport,

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Wrap an error raised inside a stage, keeping already-wrapped errors as-is
    pub fn in_stage(stage: &str, err: Error) -> Self {
        match err {
            e @ (Error::StageFailed { .. } | Error::StepLimitExceeded { .. }) => e,
            other => Error::StageFailed {
                stage: stage.to_string(),
                message: other.to_string(),
            },
        }
    }
}
