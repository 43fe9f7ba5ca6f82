//! Core abstractions for the persona analyst pipeline
//!
//! This crate defines the traits and types shared by every other crate in the
//! workspace: the [`Stage`]/[`State`] pair the orchestrator drives, the
//! per-run [`RunContext`] with its status sink, and the common [`Error`] type.

pub mod context;
pub mod error;
pub mod retry;
pub mod stage;
pub mod status;

pub use context::RunContext;
pub use error::{Error, Result};
pub use retry::RetryPolicy;
pub use stage::{Stage, State};
pub use status::{EventKind, StatusEmitter, StatusEvent};
