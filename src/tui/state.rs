use crate::model::{Candidate, Dataset, ModelRun, ProgressSnapshot, StateSnapshot};

pub struct UiState {
    pub tab: usize,
    pub info: String,

    // Mirrors of the persisted collections, refreshed on every DataChanged.
    pub datasets: Vec<Dataset>,
    pub candidates: Vec<Candidate>,
    pub model_runs: Vec<ModelRun>,

    /// Dataset currently being analyzed, if any.
    pub analyzing: Option<String>,
    /// Latest simulator snapshot while a run is in flight.
    pub progress: Option<ProgressSnapshot>,
    /// The most recently completed run this session.
    pub last_run: Option<ModelRun>,

    // Datasets tab selection.
    pub selected: usize,
    pub scroll_offset: usize,

    pub last_exported_path: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            datasets: Vec::new(),
            candidates: Vec::new(),
            model_runs: Vec::new(),
            analyzing: None,
            progress: None,
            last_run: None,
            selected: 0,
            scroll_offset: 0,
            last_exported_path: None,
        }
    }
}

impl UiState {
    /// Replace the collection mirrors and keep the selection in bounds.
    pub fn apply_snapshot(&mut self, snapshot: StateSnapshot) {
        self.datasets = snapshot.datasets;
        self.candidates = snapshot.candidates;
        self.model_runs = snapshot.model_runs;
        if self.selected >= self.datasets.len() {
            self.selected = self.datasets.len().saturating_sub(1);
        }
        if self.scroll_offset > self.selected {
            self.scroll_offset = self.selected;
        }
    }

    pub fn selected_dataset(&self) -> Option<&Dataset> {
        self.datasets.get(self.selected)
    }

    /// Candidates belonging to one dataset, in insertion order.
    pub fn candidates_for(&self, dataset_id: &str) -> Vec<&Candidate> {
        self.candidates
            .iter()
            .filter(|c| c.dataset_id == dataset_id)
            .collect()
    }

    /// Model runs belonging to one dataset, most recent first.
    pub fn model_runs_for(&self, dataset_id: &str) -> Vec<&ModelRun> {
        self.model_runs
            .iter()
            .filter(|m| m.dataset_id == dataset_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OWNER_TAG;

    fn dataset(id: &str) -> Dataset {
        Dataset {
            id: id.into(),
            name: id.into(),
            mission_source: "Kepler".into(),
            uploaded_at: "2026-01-01T00:00:00Z".into(),
            total_samples: 10,
            processed: false,
            user_id: OWNER_TAG.into(),
        }
    }

    #[test]
    fn snapshot_clamps_selection() {
        let mut state = UiState {
            selected: 2,
            scroll_offset: 2,
            ..Default::default()
        };
        state.apply_snapshot(StateSnapshot {
            datasets: vec![dataset("a")],
            candidates: Vec::new(),
            model_runs: Vec::new(),
        });
        assert_eq!(state.selected, 0);
        assert_eq!(state.scroll_offset, 0);
    }
}
