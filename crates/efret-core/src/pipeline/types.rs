/// Experiment processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Calibration,
    BleachAnalysis,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calibration => write!(f, "Estimating crosstalk"),
            Self::BleachAnalysis => write!(f, "Estimating G"),
        }
    }
}

/// Thread-safe progress reporting for set drivers and the orchestrator.
///
/// Set drivers call `advance` from rayon workers, so implementors must be
/// `Send + Sync`. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of registrations
    /// in this stage, if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// `items_done` registrations of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    fn finish_stage(&self) {}
}

/// Reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
