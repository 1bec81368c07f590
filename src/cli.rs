use crate::engine::AnalysisEngine;
use crate::model::{AnalysisConfig, AppEvent, Stage};
use crate::store::Store;
use crate::storage::DatasetReport;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "exoscan",
    version,
    about = "Exoplanet-candidate analysis dashboard with optional TUI"
)]
pub struct Cli {
    /// CSV dataset to upload and analyze on launch
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Display name for the uploaded dataset (defaults to the file stem)
    #[arg(long)]
    pub name: Option<String>,

    /// Mission source label for the uploaded dataset
    #[arg(long, default_value = "Kepler")]
    pub mission: String,

    /// Print the JSON report and exit (no TUI); requires --file
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI); requires --file
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,

    /// Delay between simulated analysis steps
    #[arg(long, default_value = "150ms")]
    pub step_delay: humantime::Duration,

    /// Override the data directory holding the persisted collections
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Export the completed run's report as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export the completed run's candidates as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Automatically analyze the uploaded dataset when the app launches
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub analyze_on_launch: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    if args.silent {
        return run_analysis(args, true).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_analysis(args, false).await;
    }

    run_text(args).await
}

/// Resolve the data directory from CLI args or the platform default.
pub fn resolve_data_dir(args: &Cli) -> PathBuf {
    args.data_dir
        .clone()
        .unwrap_or_else(crate::storage::default_data_dir)
}

/// Display name for the dataset being uploaded: explicit --name, else the
/// file stem, else a fixed fallback.
pub fn dataset_name(args: &Cli) -> String {
    if let Some(name) = args.name.as_deref() {
        return name.to_string();
    }
    args.file
        .as_deref()
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string()
}

/// Build an `AnalysisConfig` for one run.
pub fn build_analysis_config(args: &Cli, total_samples: u64) -> AnalysisConfig {
    AnalysisConfig {
        total_samples,
        step_delay: Duration::from(args.step_delay),
    }
}

/// Upload the dataset from `--file` and run one full analysis, headless.
/// Returns the store (with results recorded) and the new dataset id.
async fn run_upload_and_analyze(
    args: &Cli,
    mut on_event: impl FnMut(&AppEvent),
) -> Result<(Store, String)> {
    let file = args
        .file
        .as_deref()
        .context("--json/--text modes require --file")?;
    let mut store = Store::open(resolve_data_dir(args))?;
    let dataset = store.upload(file, &args.mission, &dataset_name(args))?;
    store.begin_analysis(&dataset.id)?;
    let started_at = crate::model::now_rfc3339();

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    let engine = AnalysisEngine::new(build_analysis_config(args, dataset.total_samples));
    let handle = tokio::spawn(async move { engine.run(evt_tx).await });

    while let Some(ev) = evt_rx.recv().await {
        on_event(&ev);
    }

    let outcome = handle
        .await
        .context("analysis task failed")?
        .context("analysis failed")?;
    store.complete_analysis(&dataset.id, started_at, outcome)?;
    Ok((store, dataset.id))
}

/// Build the exportable report for one dataset from the store's collections.
fn dataset_report<'a>(store: &'a Store, dataset_id: &str) -> Result<DatasetReport<'a>> {
    let dataset = store
        .dataset(dataset_id)
        .context("dataset missing after analysis")?;
    Ok(DatasetReport {
        dataset,
        candidates: store
            .candidates()
            .iter()
            .filter(|c| c.dataset_id == dataset_id)
            .collect(),
        model_runs: store
            .model_runs()
            .iter()
            .filter(|m| m.dataset_id == dataset_id)
            .collect(),
    })
}

/// Run a headless analysis for `--json` / `--silent --json` modes.
async fn run_analysis(args: Cli, silent: bool) -> Result<()> {
    let (store, dataset_id) = run_upload_and_analyze(&args, |_| {}).await?;
    let report = dataset_report(&store, &dataset_id)?;

    handle_exports(&args, &report)?;

    if !silent {
        let out = serde_json::to_string_pretty(&report)?;
        println!("{}", out);
    }
    Ok(())
}

async fn run_text(args: Cli) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();

    // Print stage transitions as the simulated run advances.
    let stage_tx = out_tx.clone();
    let mut last_stage = None::<Stage>;
    let (store, dataset_id) = run_upload_and_analyze(&args, move |ev| {
        if let AppEvent::Progress(snapshot) = ev {
            if last_stage != Some(snapshot.stage) {
                last_stage = Some(snapshot.stage);
                let _ = stage_tx.send(OutputLine::Stderr(format!(
                    "== {} ==",
                    snapshot.stage.label()
                )));
            }
        }
    })
    .await?;

    let report = dataset_report(&store, &dataset_id)?;
    handle_exports(&args, &report)?;

    let dataset = store
        .dataset(&dataset_id)
        .context("dataset missing after analysis")?;
    let candidates: Vec<_> = store
        .candidates()
        .iter()
        .filter(|c| c.dataset_id == dataset_id)
        .cloned()
        .collect();
    let run = store
        .model_runs()
        .iter()
        .find(|m| m.dataset_id == dataset_id)
        .context("model run missing after analysis")?;
    let summary = crate::text_summary::build_text_summary(dataset, &candidates, run);
    for line in summary.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Handle export operations (JSON and CSV) for both text and JSON modes.
fn handle_exports(args: &Cli, report: &DatasetReport) -> Result<()> {
    if let Some(p) = args.export_json.as_deref() {
        crate::storage::export_json(p, report)?;
    }
    if let Some(p) = args.export_csv.as_deref() {
        crate::storage::export_csv(p, report)?;
    }
    Ok(())
}
