//! Pipeline module.
//!
//! This module wires extraction, cleaning, decomposition, artifact export,
//! loading and quality reporting into one run.

mod builder;
pub mod progress;
mod summary;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
pub use summary::{EntityCounts, RunSummary};
