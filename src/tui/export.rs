use crate::model::Dataset;
use crate::storage::{self, DatasetReport};
use anyhow::{Context, Result};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Build the exportable report for one dataset from the UI's collection
/// mirrors.
fn build_report<'a>(state: &'a UiState, dataset: &'a Dataset) -> DatasetReport<'a> {
    DatasetReport {
        dataset,
        candidates: state.candidates_for(&dataset.id),
        model_runs: state.model_runs_for(&dataset.id),
    }
}

/// Sanitized file-name fragment from a dataset display name.
fn name_slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .to_lowercase()
}

/// Export the selected dataset's report as JSON into the current directory.
/// Returns the absolute path of the exported file.
pub fn export_report_json(state: &UiState, dataset: &Dataset) -> Result<std::path::PathBuf> {
    let default_name = format!(
        "exoscan-{}-{}.json",
        name_slug(&dataset.name),
        &dataset.id[..8.min(dataset.id.len())]
    );
    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(default_name);
    storage::export_json(&path, &build_report(state, dataset))?;
    Ok(path)
}

/// Export the selected dataset's candidates as CSV into the current directory.
/// Returns the absolute path of the exported file.
pub fn export_report_csv(state: &UiState, dataset: &Dataset) -> Result<std::path::PathBuf> {
    let default_name = format!(
        "exoscan-{}-{}.csv",
        name_slug(&dataset.name),
        &dataset.id[..8.min(dataset.id.len())]
    );
    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(default_name);
    storage::export_csv(&path, &build_report(state, dataset))?;
    Ok(path)
}

/// Initialize the clipboard manager thread if not already initialized.
/// This creates a background thread that processes clipboard operations
/// sequentially, keeping each clipboard instance alive long enough for
/// clipboard managers to read the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        // Keep the clipboard instance alive so clipboard
                        // managers have time to read the contents on Linux.
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Copy text to clipboard. Returns immediately after queuing the operation.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
