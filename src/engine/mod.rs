pub mod generate;
pub mod progress;

use crate::model::{AnalysisConfig, AnalysisOutcome, AppEvent};
use anyhow::Result;
use tokio::sync::mpsc;

/// Simulated analysis engine: staged progress followed by result generation.
///
/// A run is not cancellable and has no failure path of its own; the `Result`
/// return keeps the signature uniform with the rest of the run pipeline.
pub struct AnalysisEngine {
    cfg: AnalysisConfig,
}

impl AnalysisEngine {
    pub fn new(cfg: AnalysisConfig) -> Self {
        Self { cfg }
    }

    pub async fn run(self, event_tx: mpsc::UnboundedSender<AppEvent>) -> Result<AnalysisOutcome> {
        progress::run_stages(&event_tx, self.cfg.step_delay).await;
        Ok(generate::analysis_outcome(self.cfg.total_samples))
    }
}
