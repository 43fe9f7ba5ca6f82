//! # Analyst Server
//!
//! HTTP front end for the persona analyst pipeline.
//!
//! Routes:
//! - `GET /` serves `<static_dir>/index.html`
//! - `GET /health` liveness probe
//! - `POST /api/analyze` runs the pipeline and returns the final state
//! - `POST /api/analyze/stream` runs the pipeline and streams status events as SSE

pub mod error;
pub mod routes;
pub mod sse;

pub use error::AppError;
pub use routes::{AnalyzeResponse, AppState, router};
