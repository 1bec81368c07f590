//! JSON persistence for the three record collections.
//!
//! Each collection lives in its own file, `<key>.json`, holding one JSON
//! array. Writes always replace the whole file: the serialized collection is
//! written to a temp file in the same directory and renamed over the target,
//! so a crash mid-write never leaves a partially-written collection. There is
//! no schema version tag and no migration path.

use crate::model::{Candidate, Dataset, ModelRun};
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// Storage keys for the three collections.
pub const DATASETS_KEY: &str = "datasets";
pub const CANDIDATES_KEY: &str = "candidates";
pub const MODEL_RUNS_KEY: &str = "modelRuns";

/// Default data directory: `<platform data dir>/exoscan`, falling back to
/// `./exoscan-data` when the platform dir cannot be resolved.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("exoscan"))
        .unwrap_or_else(|| PathBuf::from("exoscan-data"))
}

fn collection_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

/// Load one collection, treating a missing file as empty.
pub fn load_collection<T: DeserializeOwned>(dir: &Path, key: &str) -> Result<Vec<T>> {
    let path = collection_path(dir, key);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Overwrite one collection in full.
pub fn save_collection<T: Serialize>(dir: &Path, key: &str, items: &[T]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create data dir {}", dir.display()))?;
    let path = collection_path(dir, key);
    let tmp = dir.join(format!(".{key}.json.tmp"));
    let text = serde_json::to_string_pretty(items).context("failed to serialize collection")?;
    std::fs::write(&tmp, text).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// One dataset's full report, the shape used for JSON exports.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport<'a> {
    pub dataset: &'a Dataset,
    pub candidates: Vec<&'a Candidate>,
    pub model_runs: Vec<&'a ModelRun>,
}

/// Export a dataset report as pretty JSON.
pub fn export_json(path: &Path, report: &DatasetReport) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write export {}", path.display()))?;
    Ok(())
}

/// Export a dataset's candidates as CSV, one row per candidate.
pub fn export_csv(path: &Path, report: &DatasetReport) -> Result<()> {
    let mut out = String::from(
        "candidate_name,classification,confidence_score,detection_method,\
         orbital_period,planet_radius,stellar_magnitude,detected_at\n",
    );
    for c in &report.candidates {
        let opt = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{:.4},{},{},{},{},{}\n",
            c.candidate_name,
            c.classification.as_str(),
            c.confidence_score,
            c.detection_method,
            opt(c.orbital_period),
            opt(c.planet_radius),
            opt(c.stellar_magnitude),
            c.detected_at,
        ));
    }
    std::fs::write(path, out)
        .with_context(|| format!("failed to write export {}", path.display()))?;
    Ok(())
}
