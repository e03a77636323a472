pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{run_experiment, run_experiment_reported, ExperimentReport};
pub use types::{NoOpReporter, PipelineStage, ProgressReporter};
