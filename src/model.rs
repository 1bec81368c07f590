use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Fixed owner tag stamped on every record. Single-user local demo; there is
/// no authentication and no per-user partitioning.
pub const OWNER_TAG: &str = "demo-user";

/// Model version label recorded on every run.
pub const MODEL_VERSION: &str = "v1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Sample count that sizes the generated candidate set.
    pub total_samples: u64,
    #[serde(with = "humantime_serde")]
    pub step_delay: Duration,
}

/// Ordered stages of a simulated analysis run. `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Loading,
    Processing,
    Analyzing,
    Complete,
}

pub const STAGES: [Stage; 4] = [
    Stage::Loading,
    Stage::Processing,
    Stage::Analyzing,
    Stage::Complete,
];

impl Stage {
    /// Human-readable label for UI layers.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Loading => "Loading Data",
            Stage::Processing => "Processing Features",
            Stage::Analyzing => "ML Analysis",
            Stage::Complete => "Complete",
        }
    }

    pub fn index(self) -> usize {
        STAGES.iter().position(|s| *s == self).unwrap_or(0)
    }
}

/// Synthetic waveform arrays carried by every progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamData {
    pub signal: Vec<f64>,
    pub noise: Vec<f64>,
    pub confidence: Vec<f64>,
}

/// One emitted progress step: current stage, overall percentage, and the
/// waveforms to animate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub stage: Stage,
    pub progress: u8,
    pub stream_data: StreamData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Exoplanet,
    FalsePositive,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Exoplanet => "exoplanet",
            Classification::FalsePositive => "false_positive",
        }
    }
}

/// An uploaded dataset. Only `processed` ever changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub mission_source: String,
    pub uploaded_at: String,
    pub total_samples: u64,
    pub processed: bool,
    pub user_id: String,
}

/// A detected object, tagged exoplanet or false positive. Immutable once
/// created; removed when its dataset is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub dataset_id: String,
    pub candidate_name: String,
    pub confidence_score: f64,
    pub classification: Classification,
    pub detection_method: String,
    pub orbital_period: Option<f64>,
    pub planet_radius: Option<f64>,
    pub stellar_magnitude: Option<f64>,
    pub features: BTreeMap<String, f64>,
    pub detected_at: String,
    pub user_id: String,
}

/// Aggregate summary of one analysis pass over a dataset. Immutable; removed
/// when its dataset is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRun {
    pub id: String,
    pub dataset_id: String,
    pub model_version: String,
    pub accuracy: Option<f64>,
    pub precision_score: Option<f64>,
    pub recall_score: Option<f64>,
    pub f1_score: Option<f64>,
    pub total_predictions: u64,
    pub exoplanet_count: u64,
    pub false_positive_count: u64,
    /// Reported execution time in milliseconds (synthetic, unrelated to the
    /// actual wall clock of the run).
    pub execution_time: u64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub user_id: String,
}

/// Candidate fields as produced by the generator, before they are bound to a
/// dataset and stamped with id/time/owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDraft {
    pub candidate_name: String,
    pub confidence_score: f64,
    pub classification: Classification,
    pub detection_method: String,
    pub orbital_period: Option<f64>,
    pub planet_radius: Option<f64>,
    pub stellar_magnitude: Option<f64>,
    pub features: BTreeMap<String, f64>,
}

/// Aggregate metrics as produced by the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision_score: f64,
    pub recall_score: f64,
    pub f1_score: f64,
    pub total_predictions: u64,
    pub exoplanet_count: u64,
    pub false_positive_count: u64,
    pub execution_time: u64,
}

/// Everything a completed engine run yields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub candidates: Vec<CandidateDraft>,
    pub metrics: ModelMetrics,
}

/// Read-only copy of the persisted collections, sent to presentation layers
/// after every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub datasets: Vec<Dataset>,
    pub candidates: Vec<Candidate>,
    pub model_runs: Vec<ModelRun>,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Simulator step; forwarded to the display surface as-is.
    Progress(ProgressSnapshot),
    AnalysisStarted {
        dataset_id: String,
    },
    AnalysisCompleted {
        dataset_id: String,
        // Box to keep AppEvent small; ModelRun is the largest payload.
        run: Box<ModelRun>,
    },
    /// Collections changed (upload, completion, delete); carries fresh copies.
    DataChanged(Box<StateSnapshot>),
    Info(InfoEvent),
}

/// Structured info events consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    UploadComplete { name: String, total_samples: u64 },
    AnalysisBusy { active_dataset_id: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::UploadComplete {
                name,
                total_samples,
            } => {
                format!("Uploaded \"{}\" ({} samples)", name, total_samples)
            }
            InfoEvent::AnalysisBusy { active_dataset_id } => {
                format!(
                    "Another analysis is already running (dataset {})",
                    active_dataset_id
                )
            }
        }
    }
}

/// Current UTC time as an RFC 3339 string, the stamp format used on all
/// persisted records.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}
