//! Application state holder.
//!
//! Owns the three in-memory collections and the single analyzing slot. All
//! mutation happens on the control task that owns this struct, so no locking
//! is needed; every mutating operation re-persists the affected collections
//! before returning to its caller. If a persist fails after the in-memory
//! update, the two views diverge silently — accepted gap, no retry.

use crate::ingest;
use crate::model::{
    AnalysisOutcome, Candidate, Dataset, ModelRun, StateSnapshot, MODEL_VERSION, OWNER_TAG,
};
use crate::storage::{
    self, CANDIDATES_KEY, DATASETS_KEY, MODEL_RUNS_KEY,
};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

pub struct Store {
    data_dir: PathBuf,
    datasets: Vec<Dataset>,
    candidates: Vec<Candidate>,
    model_runs: Vec<ModelRun>,
    /// Dataset currently being analyzed, if any. At most one run is ever in
    /// flight; a second analyze request is rejected while this is occupied.
    analyzing: Option<String>,
}

impl Store {
    /// Load all collections from `data_dir` (missing files load as empty).
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let datasets = storage::load_collection(&data_dir, DATASETS_KEY)?;
        let candidates = storage::load_collection(&data_dir, CANDIDATES_KEY)?;
        let model_runs = storage::load_collection(&data_dir, MODEL_RUNS_KEY)?;
        Ok(Self {
            data_dir,
            datasets,
            candidates,
            model_runs,
            analyzing: None,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn model_runs(&self) -> &[ModelRun] {
        &self.model_runs
    }

    pub fn analyzing(&self) -> Option<&str> {
        self.analyzing.as_deref()
    }

    pub fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    /// Fresh copies of all collections for presentation layers.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            datasets: self.datasets.clone(),
            candidates: self.candidates.clone(),
            model_runs: self.model_runs.clone(),
        }
    }

    /// Ingest a dataset file: count samples, append the record, persist.
    ///
    /// Validation failures (missing file, blank name) abort before any state
    /// mutation. Returns the new dataset; the caller is expected to trigger
    /// analysis for it immediately.
    pub fn upload(&mut self, file: &Path, mission_source: &str, name: &str) -> Result<Dataset> {
        let name = name.trim();
        if name.is_empty() {
            bail!("dataset name must not be blank");
        }
        if !file.exists() {
            bail!("dataset file {} does not exist", file.display());
        }
        let total_samples = ingest::count_samples(file)?;

        let dataset = Dataset {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            mission_source: mission_source.to_string(),
            uploaded_at: crate::model::now_rfc3339(),
            total_samples,
            processed: false,
            user_id: OWNER_TAG.to_string(),
        };
        self.datasets.push(dataset.clone());
        self.persist_datasets()?;
        Ok(dataset)
    }

    /// Claim the analyzing slot for `dataset_id`.
    ///
    /// Fails without touching the slot when a run is already in flight or the
    /// dataset does not exist.
    pub fn begin_analysis(&mut self, dataset_id: &str) -> Result<()> {
        if let Some(active) = &self.analyzing {
            bail!("analysis already in progress for dataset {active}");
        }
        if self.dataset(dataset_id).is_none() {
            bail!("unknown dataset {dataset_id}");
        }
        self.analyzing = Some(dataset_id.to_string());
        Ok(())
    }

    /// Release the analyzing slot without recording results. Used when the
    /// run task dies; a normal completion goes through `complete_analysis`.
    pub fn abort_analysis(&mut self) {
        self.analyzing = None;
    }

    /// Convert a finished run into records, mark the dataset processed, and
    /// persist all three collections. Releases the analyzing slot.
    ///
    /// The new model run is prepended (most recent first); candidates are
    /// appended. `started_at` reflects when the run began.
    pub fn complete_analysis(
        &mut self,
        dataset_id: &str,
        started_at: String,
        outcome: AnalysisOutcome,
    ) -> Result<ModelRun> {
        self.analyzing = None;
        let now = crate::model::now_rfc3339();

        let new_candidates: Vec<Candidate> = outcome
            .candidates
            .into_iter()
            .map(|draft| Candidate {
                id: uuid::Uuid::new_v4().to_string(),
                dataset_id: dataset_id.to_string(),
                candidate_name: draft.candidate_name,
                confidence_score: draft.confidence_score,
                classification: draft.classification,
                detection_method: draft.detection_method,
                orbital_period: draft.orbital_period,
                planet_radius: draft.planet_radius,
                stellar_magnitude: draft.stellar_magnitude,
                features: draft.features,
                detected_at: now.clone(),
                user_id: OWNER_TAG.to_string(),
            })
            .collect();

        let m = outcome.metrics;
        let run = ModelRun {
            id: uuid::Uuid::new_v4().to_string(),
            dataset_id: dataset_id.to_string(),
            model_version: MODEL_VERSION.to_string(),
            accuracy: Some(m.accuracy),
            precision_score: Some(m.precision_score),
            recall_score: Some(m.recall_score),
            f1_score: Some(m.f1_score),
            total_predictions: m.total_predictions,
            exoplanet_count: m.exoplanet_count,
            false_positive_count: m.false_positive_count,
            execution_time: m.execution_time,
            started_at,
            completed_at: Some(now),
            user_id: OWNER_TAG.to_string(),
        };

        self.candidates.extend(new_candidates);
        self.model_runs.insert(0, run.clone());
        if let Some(ds) = self.datasets.iter_mut().find(|d| d.id == dataset_id) {
            ds.processed = true;
        }

        self.persist_all()
            .context("failed to persist analysis results")?;
        Ok(run)
    }

    /// Remove a dataset and cascade-delete its candidates and model runs,
    /// then persist all three collections.
    pub fn delete_dataset(&mut self, dataset_id: &str) -> Result<()> {
        if self.analyzing.as_deref() == Some(dataset_id) {
            bail!("cannot delete a dataset while it is being analyzed");
        }
        if self.dataset(dataset_id).is_none() {
            bail!("unknown dataset {dataset_id}");
        }
        self.datasets.retain(|d| d.id != dataset_id);
        self.candidates.retain(|c| c.dataset_id != dataset_id);
        self.model_runs.retain(|m| m.dataset_id != dataset_id);
        self.persist_all()
            .context("failed to persist after delete")?;
        Ok(())
    }

    fn persist_datasets(&self) -> Result<()> {
        storage::save_collection(&self.data_dir, DATASETS_KEY, &self.datasets)
    }

    fn persist_all(&self) -> Result<()> {
        storage::save_collection(&self.data_dir, DATASETS_KEY, &self.datasets)?;
        storage::save_collection(&self.data_dir, CANDIDATES_KEY, &self.candidates)?;
        storage::save_collection(&self.data_dir, MODEL_RUNS_KEY, &self.model_runs)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate;
    use std::io::Write;

    fn store_with_csv(rows: usize) -> (tempfile::TempDir, Store, Dataset) {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("light_curves.csv");
        let mut f = std::fs::File::create(&csv_path).unwrap();
        writeln!(f, "flux,period").unwrap();
        for i in 0..rows {
            writeln!(f, "0.{i},{i}").unwrap();
        }
        let mut store = Store::open(dir.path().join("data")).unwrap();
        let ds = store.upload(&csv_path, "Kepler", "Kepler Q1").unwrap();
        (dir, store, ds)
    }

    #[test]
    fn upload_counts_samples_and_persists() {
        let (_dir, store, ds) = store_with_csv(30);
        assert_eq!(ds.total_samples, 30);
        assert!(!ds.processed);
        assert_eq!(ds.user_id, OWNER_TAG);
        assert_eq!(store.datasets().len(), 1);

        // A fresh store sees the persisted dataset.
        let reopened = Store::open(store.data_dir().to_path_buf()).unwrap();
        assert_eq!(reopened.datasets().len(), 1);
        assert_eq!(reopened.datasets()[0].id, ds.id);
    }

    #[test]
    fn blank_name_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("d.csv");
        std::fs::write(&csv_path, "a\n1\n").unwrap();
        let mut store = Store::open(dir.path().join("data")).unwrap();
        assert!(store.upload(&csv_path, "TESS", "   ").is_err());
        assert!(store.datasets().is_empty());
        assert!(!dir.path().join("data").join("datasets.json").exists());
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(dir.path().join("data")).unwrap();
        assert!(store
            .upload(Path::new("/nonexistent.csv"), "K2", "K2 C3")
            .is_err());
        assert!(store.datasets().is_empty());
    }

    #[test]
    fn analyzing_slot_is_exclusive() {
        let (_dir, mut store, ds) = store_with_csv(20);
        store.begin_analysis(&ds.id).unwrap();
        assert_eq!(store.analyzing(), Some(ds.id.as_str()));
        assert!(store.begin_analysis(&ds.id).is_err());
        assert_eq!(store.analyzing(), Some(ds.id.as_str()));
        store.abort_analysis();
        assert!(store.analyzing().is_none());
    }

    #[test]
    fn complete_analysis_records_and_marks_processed() {
        let (_dir, mut store, ds) = store_with_csv(100);
        store.begin_analysis(&ds.id).unwrap();
        let outcome = generate::analysis_outcome(ds.total_samples);
        let expected = outcome.candidates.len();
        let run = store
            .complete_analysis(&ds.id, crate::model::now_rfc3339(), outcome)
            .unwrap();

        assert!(store.analyzing().is_none());
        assert_eq!(store.candidates().len(), expected);
        assert_eq!(store.model_runs().len(), 1);
        assert_eq!(store.model_runs()[0].id, run.id);
        assert!(store.dataset(&ds.id).unwrap().processed);
        assert_eq!(run.model_version, MODEL_VERSION);
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn reanalysis_prepends_the_newest_run() {
        let (_dir, mut store, ds) = store_with_csv(40);
        for _ in 0..2 {
            store.begin_analysis(&ds.id).unwrap();
            let outcome = generate::analysis_outcome(ds.total_samples);
            store
                .complete_analysis(&ds.id, crate::model::now_rfc3339(), outcome)
                .unwrap();
        }
        assert_eq!(store.model_runs().len(), 2);
        assert_ne!(store.model_runs()[0].id, store.model_runs()[1].id);
        // Candidates from both runs accumulate.
        assert_eq!(store.candidates().len(), 8);
    }

    #[test]
    fn delete_cascades_to_exactly_the_dataset_dependents() {
        let (_dir, mut store, first) = store_with_csv(50);
        let csv2 = store.data_dir().parent().unwrap().join("second.csv");
        std::fs::write(&csv2, "h\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n").unwrap();
        let second = store.upload(&csv2, "TESS", "TESS S1").unwrap();

        for ds in [&first, &second] {
            store.begin_analysis(&ds.id).unwrap();
            let outcome = generate::analysis_outcome(ds.total_samples);
            store
                .complete_analysis(&ds.id, crate::model::now_rfc3339(), outcome)
                .unwrap();
        }
        let second_candidates = store
            .candidates()
            .iter()
            .filter(|c| c.dataset_id == second.id)
            .count();
        assert!(second_candidates > 0);

        store.delete_dataset(&first.id).unwrap();
        assert!(store.dataset(&first.id).is_none());
        assert!(store.candidates().iter().all(|c| c.dataset_id == second.id));
        assert!(store.model_runs().iter().all(|m| m.dataset_id == second.id));
        assert_eq!(store.candidates().len(), second_candidates);

        // The cascade is durable.
        let reopened = Store::open(store.data_dir().to_path_buf()).unwrap();
        assert_eq!(reopened.datasets().len(), 1);
        assert!(reopened.candidates().iter().all(|c| c.dataset_id == second.id));
    }

    #[test]
    fn delete_is_blocked_while_analyzing() {
        let (_dir, mut store, ds) = store_with_csv(20);
        store.begin_analysis(&ds.id).unwrap();
        assert!(store.delete_dataset(&ds.id).is_err());
        assert!(store.dataset(&ds.id).is_some());
    }
}
