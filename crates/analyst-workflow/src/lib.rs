//! Linear stage orchestration
//!
//! A [`Pipeline`] runs a fixed list of stages in order, merging each stage's
//! update into a shared state record. There is no branching and no cycles.

pub mod pipeline;

pub use pipeline::{DEFAULT_STEP_LIMIT, Pipeline, PipelineBuilder};
