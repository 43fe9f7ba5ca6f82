//! Stage and State traits driven by the orchestrator

use crate::{Result, RunContext};
use async_trait::async_trait;

/// Shared record threaded through a run
///
/// A stage never mutates the state directly; it returns an update which the
/// orchestrator merges. Implementations decide how conflicting writes are
/// rejected.
pub trait State: Send + Sync + 'static {
    /// Partial record produced by one stage
    type Update: Send + 'static;

    /// Merge a stage's update into the state
    fn merge(&mut self, update: Self::Update) -> Result<()>;
}

/// One step of a linear pipeline
#[async_trait]
pub trait Stage<S: State>: Send + Sync {
    /// Stable node name, used in status events and tracing spans
    fn name(&self) -> &str;

    /// Read what the stage needs from `state` and return its partial update
    async fn run(&self, state: &S, ctx: &RunContext) -> Result<S::Update>;
}
