//! Pipeline definition and execution

use analyst_core::{Error, Result, RunContext, Stage, State};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span};

/// Ceiling on stage steps per run unless configured otherwise
pub const DEFAULT_STEP_LIMIT: usize = 100;

/// A fixed, forward-only sequence of stages over state `S`
///
/// # Example
///
/// ```no_run
/// use analyst_workflow::Pipeline;
/// use analyst_core::RunContext;
/// use std::sync::Arc;
///
/// # async fn example<S: analyst_core::State>(
/// #     first: Arc<dyn analyst_core::Stage<S>>,
/// #     second: Arc<dyn analyst_core::Stage<S>>,
/// #     initial: S,
/// # ) -> analyst_core::Result<()> {
/// let pipeline = Pipeline::builder()
///     .add_stage(first)
///     .add_stage(second)
///     .build()?;
///
/// let final_state = pipeline.execute(initial, &RunContext::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<S: State> {
    stages: Vec<Arc<dyn Stage<S>>>,
    step_limit: usize,
}

impl<S: State> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("step_limit", &self.step_limit)
            .finish()
    }
}

impl<S: State> Pipeline<S> {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder<S> {
        PipelineBuilder::new()
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Run every stage in order and return the final state
    pub async fn execute(&self, initial: S, ctx: &RunContext) -> Result<S> {
        self.execute_with(initial, ctx, |_, _| {}).await
    }

    /// Run every stage, calling `on_step` after each stage's update is merged
    ///
    /// The first failing stage aborts the run; its error is reported as
    /// [`Error::StageFailed`] naming the stage.
    pub async fn execute_with<F>(&self, initial: S, ctx: &RunContext, mut on_step: F) -> Result<S>
    where
        F: FnMut(&str, &S) + Send,
    {
        let mut state = initial;
        let started = Instant::now();
        info!(run_id = %ctx.run_id(), stages = self.stages.len(), "Pipeline started");

        for (step, stage) in self.stages.iter().enumerate() {
            if step >= self.step_limit {
                return Err(Error::StepLimitExceeded {
                    limit: self.step_limit,
                });
            }

            let name = stage.name();
            let span = info_span!("stage", stage = name, run_id = %ctx.run_id());
            let stage_started = Instant::now();

            let update = stage
                .run(&state, ctx)
                .instrument(span)
                .await
                .map_err(|e| Error::in_stage(name, e))?;
            state.merge(update).map_err(|e| Error::in_stage(name, e))?;

            debug!(stage = name, elapsed_ms = stage_started.elapsed().as_millis(), "Stage completed");
            on_step(name, &state);
        }

        info!(
            run_id = %ctx.run_id(),
            elapsed_ms = started.elapsed().as_millis(),
            "Pipeline finished"
        );
        Ok(state)
    }
}

/// Builder for constructing pipelines
pub struct PipelineBuilder<S: State> {
    stages: Vec<Arc<dyn Stage<S>>>,
    step_limit: usize,
}

impl<S: State> Default for PipelineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> PipelineBuilder<S> {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Append a stage
    pub fn add_stage(mut self, stage: Arc<dyn Stage<S>>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a stage only when `enabled`
    pub fn add_stage_if(self, enabled: bool, stage: Arc<dyn Stage<S>>) -> Self {
        if enabled { self.add_stage(stage) } else { self }
    }

    /// Maximum number of stage steps per run
    pub fn step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline<S>> {
        if self.stages.is_empty() {
            return Err(Error::Configuration("pipeline has no stages".to_string()));
        }
        if self.step_limit == 0 {
            return Err(Error::Configuration("step limit must be at least 1".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name().to_string()) {
                return Err(Error::Configuration(format!(
                    "duplicate stage name '{}'",
                    stage.name()
                )));
            }
        }

        Ok(Pipeline {
            stages: self.stages,
            step_limit: self.step_limit,
        })
    }
}
