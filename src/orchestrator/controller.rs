//! Run lifecycle controller.
//!
//! Owns the store and the single in-flight analysis, and emits events for
//! presentation layers. All state mutation happens here, on one task.

use crate::cli::Cli;
use crate::engine::AnalysisEngine;
use crate::model::{AnalysisOutcome, AppEvent, InfoEvent};
use crate::store::Store;
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Analyze(String),
    Delete(String),
    Refresh,
    Quit,
}

/// Handle for the in-flight analysis task.
struct RunCtx {
    dataset_id: String,
    started_at: String,
    handle: Option<tokio::task::JoinHandle<Result<AnalysisOutcome>>>,
}

/// Claim the analyzing slot and spawn the engine for `dataset_id`.
///
/// On rejection (slot busy, unknown dataset) an info event is emitted and no
/// task is spawned.
fn start_run(
    store: &mut Store,
    args: &Cli,
    dataset_id: &str,
    event_tx: UnboundedSender<AppEvent>,
) -> Option<RunCtx> {
    if let Some(active) = store.analyzing() {
        let _ = event_tx.send(AppEvent::Info(InfoEvent::AnalysisBusy {
            active_dataset_id: active.to_string(),
        }));
        return None;
    }
    let total_samples = match store.dataset(dataset_id) {
        Some(ds) => ds.total_samples,
        None => {
            let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(format!(
                "Unknown dataset {dataset_id}"
            ))));
            return None;
        }
    };
    if let Err(e) = store.begin_analysis(dataset_id) {
        let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(format!("{e:#}"))));
        return None;
    }

    let cfg = crate::cli::build_analysis_config(args, total_samples);
    let started_at = crate::model::now_rfc3339();
    let _ = event_tx.send(AppEvent::AnalysisStarted {
        dataset_id: dataset_id.to_string(),
    });
    let engine = AnalysisEngine::new(cfg);
    let handle = tokio::spawn(async move { engine.run(event_tx).await });
    Some(RunCtx {
        dataset_id: dataset_id.to_string(),
        started_at,
        handle: Some(handle),
    })
}

fn send_snapshot(store: &Store, event_tx: &UnboundedSender<AppEvent>) {
    let _ = event_tx.send(AppEvent::DataChanged(Box::new(store.snapshot())));
}

/// Orchestrate uploads and analysis runs based on UI commands.
pub(crate) async fn run_controller(
    args: &Cli,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut store = Store::open(crate::cli::resolve_data_dir(args))?;
    send_snapshot(&store, &event_tx);

    let mut run_ctx: Option<RunCtx> = None;

    // Upload-on-launch: ingest the file from the command line, then analyze
    // it immediately unless the user opted out.
    if let Some(file) = args.file.as_deref() {
        match store.upload(file, &args.mission, &crate::cli::dataset_name(args)) {
            Ok(ds) => {
                let _ = event_tx.send(AppEvent::Info(InfoEvent::UploadComplete {
                    name: ds.name.clone(),
                    total_samples: ds.total_samples,
                }));
                send_snapshot(&store, &event_tx);
                if args.analyze_on_launch {
                    run_ctx = start_run(&mut store, args, &ds.id, event_tx.clone());
                }
            }
            Err(e) => {
                let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(format!(
                    "Upload failed: {e:#}"
                ))));
            }
        }
    }

    let res = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Analyze(id)) => {
                        if run_ctx.is_none() {
                            run_ctx = start_run(&mut store, args, &id, event_tx.clone());
                        } else if let Some(active) = store.analyzing() {
                            let _ = event_tx.send(AppEvent::Info(InfoEvent::AnalysisBusy {
                                active_dataset_id: active.to_string(),
                            }));
                        }
                    }
                    Some(UiCommand::Delete(id)) => {
                        match store.delete_dataset(&id) {
                            Ok(()) => {
                                let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(
                                    "Deleted".into(),
                                )));
                                send_snapshot(&store, &event_tx);
                            }
                            Err(e) => {
                                let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(
                                    format!("Delete failed: {e:#}"),
                                )));
                            }
                        }
                    }
                    Some(UiCommand::Refresh) => {
                        send_snapshot(&store, &event_tx);
                    }
                    Some(UiCommand::Quit) | None => {
                        break Ok(());
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it
            // can be dropped if another select branch is chosen, and we'll
            // never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    if let Some(ctx) = run_ctx.take() {
                        match join_res {
                            Ok(Ok(outcome)) => {
                                match store.complete_analysis(&ctx.dataset_id, ctx.started_at, outcome) {
                                    Ok(run) => {
                                        let _ = event_tx.send(AppEvent::AnalysisCompleted {
                                            dataset_id: ctx.dataset_id.clone(),
                                            run: Box::new(run),
                                        });
                                        send_snapshot(&store, &event_tx);
                                    }
                                    Err(e) => {
                                        let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(
                                            format!("Failed to record results: {e:#}"),
                                        )));
                                        send_snapshot(&store, &event_tx);
                                    }
                                }
                            }
                            Ok(Err(e)) => {
                                store.abort_analysis();
                                let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(format!(
                                    "Analysis failed: {e:#}"
                                ))));
                            }
                            Err(e) => {
                                store.abort_analysis();
                                let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(format!(
                                    "Analysis task join failed: {e}"
                                ))));
                            }
                        }
                    }
                }
            }
        }
    };

    // Runs are not cancellable; quitting mid-run tears the task down with the
    // process. The dataset is simply left unprocessed.
    if let Some(ctx) = run_ctx.as_mut() {
        if let Some(h) = ctx.handle.take() {
            h.abort();
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppEvent, Stage};
    use crate::store::Store;
    use clap::Parser;
    use tokio::sync::mpsc;

    fn test_args(data_dir: &std::path::Path, file: &std::path::Path) -> Cli {
        Cli::parse_from([
            "exoscan",
            "--file",
            file.to_str().unwrap(),
            "--name",
            "Kepler Q1",
            "--mission",
            "Kepler",
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--step-delay",
            "1ms",
        ])
    }

    fn write_csv(dir: &std::path::Path, rows: usize) -> std::path::PathBuf {
        let path = dir.join("light_curves.csv");
        let mut text = String::from("flux,period\n");
        for i in 0..rows {
            text.push_str(&format!("0.{i},{i}\n"));
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    #[tokio::test(start_paused = true)]
    async fn upload_on_launch_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let csv = write_csv(dir.path(), 30);
        let args = test_args(&data_dir, &csv);

        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

        let consumer = tokio::spawn(async move {
            let mut progress = Vec::new();
            let mut completed = None;
            while let Some(ev) = evt_rx.recv().await {
                match ev {
                    AppEvent::Progress(s) => progress.push(s),
                    AppEvent::AnalysisCompleted { run, .. } => {
                        completed = Some(*run);
                        let _ = cmd_tx.send(UiCommand::Quit);
                    }
                    _ => {}
                }
            }
            (progress, completed)
        });

        run_controller(&args, evt_tx, cmd_rx).await.unwrap();
        let (progress, completed) = consumer.await.unwrap();

        assert_eq!(progress.len(), 44);
        assert_eq!(progress.first().unwrap().stage, Stage::Loading);
        assert_eq!(progress.first().unwrap().progress, 0);
        assert_eq!(progress.last().unwrap().stage, Stage::Complete);
        assert_eq!(progress.last().unwrap().progress, 100);

        let run = completed.expect("no completion event");
        assert_eq!(run.total_predictions, 3);

        // Results are durable under the expected collection keys.
        for key in ["datasets.json", "candidates.json", "modelRuns.json"] {
            assert!(data_dir.join(key).exists(), "missing {key}");
        }
        let store = Store::open(data_dir).unwrap();
        assert_eq!(store.datasets().len(), 1);
        assert!(store.datasets()[0].processed);
        assert_eq!(store.candidates().len(), 3);
        assert_eq!(store.model_runs().len(), 1);
        assert_eq!(store.model_runs()[0].id, run.id);
    }

    #[tokio::test(start_paused = true)]
    async fn second_analyze_is_rejected_while_one_is_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let csv = write_csv(dir.path(), 20);
        let args = test_args(&data_dir, &csv);

        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

        let consumer = tokio::spawn(async move {
            let mut busy_seen = false;
            while let Some(ev) = evt_rx.recv().await {
                match ev {
                    AppEvent::AnalysisStarted { dataset_id } => {
                        let _ = cmd_tx.send(UiCommand::Analyze(dataset_id));
                    }
                    AppEvent::Info(InfoEvent::AnalysisBusy { .. }) => {
                        busy_seen = true;
                    }
                    AppEvent::AnalysisCompleted { .. } => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                    }
                    _ => {}
                }
            }
            busy_seen
        });

        run_controller(&args, evt_tx, cmd_rx).await.unwrap();
        assert!(consumer.await.unwrap(), "busy rejection was never emitted");

        // Exactly one run was recorded despite the second request.
        let store = Store::open(data_dir).unwrap();
        assert_eq!(store.model_runs().len(), 1);
    }
}
