//! Per-run execution context
//!
//! Every pipeline run gets its own [`RunContext`], passed explicitly to each
//! stage. It carries the run id used in tracing spans and the status emitter,
//! so concurrent runs never see each other's events.

use crate::status::{StatusEmitter, StatusEvent};
use uuid::Uuid;

/// Context passed to stages during a run
///
/// # Example
///
/// ```
/// use analyst_core::{RunContext, StatusEmitter};
///
/// let (emitter, mut rx) = StatusEmitter::channel();
/// let ctx = RunContext::new().with_emitter(emitter);
/// ctx.status("stock_info", "Gathering financial data", "Searching (1/13)");
///
/// assert_eq!(rx.try_recv().unwrap().message.as_deref(), Some("Searching (1/13)"));
/// ```
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    emitter: StatusEmitter,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Fresh context with a new run id and no listener
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            emitter: StatusEmitter::detached(),
        }
    }

    /// Attach a status emitter
    pub fn with_emitter(mut self, emitter: StatusEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn emitter(&self) -> &StatusEmitter {
        &self.emitter
    }

    /// Forward an event to the listener, if any
    pub fn emit(&self, event: StatusEvent) {
        self.emitter.emit(event);
    }

    /// Shorthand for a `status` event
    pub fn status(&self, node: &str, label: &str, message: impl Into<String>) {
        self.emit(StatusEvent::status(node, label, message));
    }
}
