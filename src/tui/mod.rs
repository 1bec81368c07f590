mod charts;
mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::metrics;
use crate::model::AppEvent;
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure in the hot path; progress
    // snapshots are emitted on a fixed cadence regardless of consumer speed.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the
    // Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(&args, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::default();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 3;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 2;
                    }
                    (_, KeyCode::Char('r')) => {
                        let _ = cmd_tx.send(UiCommand::Refresh);
                        state.info = "Refreshed".into();
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
                        if state.tab == 1 && state.selected > 0 {
                            state.selected -= 1;
                            if state.selected < state.scroll_offset {
                                state.scroll_offset = state.selected;
                            }
                        }
                    }
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
                        if state.tab == 1
                            && state.selected < state.datasets.len().saturating_sub(1)
                        {
                            state.selected += 1;
                            let visible = 20;
                            if state.selected >= state.scroll_offset + visible {
                                state.scroll_offset = state.selected.saturating_sub(visible - 1);
                            }
                        }
                    }
                    (_, KeyCode::Char('a')) => {
                        if state.tab == 1 {
                            if let Some(ds) = state.selected_dataset() {
                                let _ = cmd_tx.send(UiCommand::Analyze(ds.id.clone()));
                            } else {
                                state.info = "No dataset selected.".into();
                            }
                        }
                    }
                    (_, KeyCode::Char('d')) => {
                        if state.tab == 1 {
                            if let Some(ds) = state.selected_dataset() {
                                if state.analyzing.as_deref() == Some(ds.id.as_str()) {
                                    state.info =
                                        "Cannot delete while the dataset is being analyzed.".into();
                                } else {
                                    let _ = cmd_tx.send(UiCommand::Delete(ds.id.clone()));
                                }
                            }
                        }
                    }
                    (_, KeyCode::Char('e')) => {
                        if state.tab == 1 {
                            if let Some(ds) = state.selected_dataset().cloned() {
                                match export::export_report_json(&state, &ds) {
                                    Ok(p) => {
                                        let path_str = p.to_string_lossy().to_string();
                                        state.last_exported_path = Some(path_str);
                                        state.info = format!(
                                            "Exported JSON: {} (press 'y' to copy path)",
                                            p.display()
                                        );
                                    }
                                    Err(e) => {
                                        state.info = format!("JSON export failed: {e:#}");
                                    }
                                }
                            }
                        }
                    }
                    (_, KeyCode::Char('c')) => {
                        if state.tab == 1 {
                            if let Some(ds) = state.selected_dataset().cloned() {
                                match export::export_report_csv(&state, &ds) {
                                    Ok(p) => {
                                        let path_str = p.to_string_lossy().to_string();
                                        state.last_exported_path = Some(path_str);
                                        state.info = format!(
                                            "Exported CSV: {} (press 'y' to copy path)",
                                            p.display()
                                        );
                                    }
                                    Err(e) => {
                                        state.info = format!("CSV export failed: {e:#}");
                                    }
                                }
                            }
                        }
                    }
                    (_, KeyCode::Char('y')) => {
                        if let Some(ref path) = state.last_exported_path {
                            match export::copy_to_clipboard(path) {
                                Ok(_) => {
                                    state.info = format!("Copied to clipboard: {}", path);
                                }
                                Err(e) => {
                                    state.info = format!("Clipboard copy failed: {e:#}");
                                }
                            }
                        } else {
                            state.info =
                                "No exported file path to copy. Export a file first (e/c)".into();
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, ev: AppEvent) {
    match ev {
        AppEvent::Progress(snapshot) => {
            state.progress = Some(snapshot);
        }
        AppEvent::AnalysisStarted { dataset_id } => {
            let name = state
                .datasets
                .iter()
                .find(|d| d.id == dataset_id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| dataset_id.clone());
            state.analyzing = Some(dataset_id);
            state.info = format!("Analyzing \"{name}\"…");
        }
        AppEvent::AnalysisCompleted { dataset_id: _, run } => {
            state.analyzing = None;
            state.progress = None;
            state.info = format!(
                "Analysis complete: {} predictions ({} exoplanets, {} false positives)",
                run.total_predictions, run.exoplanet_count, run.false_positive_count
            );
            state.last_run = Some(*run);
        }
        AppEvent::DataChanged(snapshot) => {
            state.apply_snapshot(*snapshot);
        }
        AppEvent::Info(info) => state.info = info.to_message(),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("Datasets"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("exoscan"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state),
        1 => draw_datasets(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    if let (Some(progress), Some(_)) = (&state.progress, &state.analyzing) {
        draw_analysis(area, f, state, progress);
    } else {
        draw_results(area, f, state);
    }
}

/// Live view while a run is in flight: stage tracker, gauge, waveforms.
fn draw_analysis(
    area: Rect,
    f: &mut ratatui::Frame,
    state: &UiState,
    progress: &crate::model::ProgressSnapshot,
) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(6),
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    charts::render_stage_tracker(f, main[0], progress.stage);
    charts::render_progress_gauge(f, main[1], progress.progress);

    let charts_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[2]);
    charts::render_waveform(
        f,
        charts_row[0],
        "Signal",
        &progress.stream_data.signal,
        Color::Green,
    );
    charts::render_waveform(
        f,
        charts_row[1],
        "Confidence",
        &progress.stream_data.confidence,
        Color::Cyan,
    );

    draw_status(main[3], f, state);
}

/// Results view: summary cards, top candidates, latest model run.
fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    if state.candidates.is_empty() && state.model_runs.is_empty() {
        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
            .split(area);
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from("No analysis results yet"),
            Line::from(Span::styled(
                "Upload and analyze a dataset to see results",
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "exoscan --file <dataset.csv> --mission Kepler",
                Style::default().fg(Color::Cyan),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Results"));
        f.render_widget(empty, main[0]);
        draw_status(main[1], f, state);
        return;
    }

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Min(6),
                Constraint::Length(8),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let summary = metrics::dashboard_summary(&state.candidates, state.model_runs.first());
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ]
            .as_ref(),
        )
        .split(main[0]);
    charts::render_summary_card(
        f,
        cards[0],
        "Exoplanets Detected",
        summary.exoplanet_count.to_string(),
        Color::Cyan,
    );
    charts::render_summary_card(
        f,
        cards[1],
        "False Positives",
        summary.false_positive_count.to_string(),
        Color::Gray,
    );
    charts::render_summary_card(
        f,
        cards[2],
        "Avg Confidence",
        format!("{:.1}%", summary.avg_confidence * 100.0),
        Color::Green,
    );
    charts::render_summary_card(
        f,
        cards[3],
        "Model Accuracy",
        summary
            .model_accuracy
            .map(|a| format!("{:.1}%", a * 100.0))
            .unwrap_or_else(|| "N/A".into()),
        Color::Blue,
    );

    draw_top_candidates(main[1], f, state);
    draw_latest_run(main[2], f, state);
    draw_status(main[3], f, state);
}

fn draw_top_candidates(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let top = metrics::top_candidates(&state.candidates, 5);
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{:<12} {:>10} {:>16} {:>10} {:>9}",
            "CANDIDATE", "CONFIDENCE", "ORBITAL PERIOD", "RADIUS", "METHOD"
        ),
        Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
    ))];
    if top.is_empty() {
        lines.push(Line::from(Span::styled(
            "No high-confidence exoplanet candidates yet",
            Style::default().fg(Color::Gray),
        )));
    }
    for c in top {
        let period = c
            .orbital_period
            .map(|p| format!("{p:.2} days"))
            .unwrap_or_else(|| "N/A".into());
        let radius = c
            .planet_radius
            .map(|r| format!("{r:.2} Re"))
            .unwrap_or_else(|| "N/A".into());
        lines.push(Line::from(vec![
            Span::raw(format!("{:<12} ", c.candidate_name)),
            Span::styled(
                format!("{:>10} ", format!("{:.1}%", c.confidence_score * 100.0)),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(format!("{:>16} {:>10} {:>9}", period, radius, c.detection_method)),
        ]));
    }
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Top Exoplanet Candidates"),
    );
    f.render_widget(p, area);
}

fn draw_latest_run(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let pct = |v: Option<f64>| {
        v.map(|x| format!("{:.1}%", x * 100.0))
            .unwrap_or_else(|| "N/A".into())
    };
    let lines = match state.model_runs.first() {
        Some(run) => vec![
            Line::from(vec![
                Span::styled("Model version: ", Style::default().fg(Color::Gray)),
                Span::raw(run.model_version.clone()),
            ]),
            Line::from(vec![
                Span::styled("Precision: ", Style::default().fg(Color::Gray)),
                Span::raw(pct(run.precision_score)),
                Span::raw("   "),
                Span::styled("Recall: ", Style::default().fg(Color::Gray)),
                Span::raw(pct(run.recall_score)),
                Span::raw("   "),
                Span::styled("F1: ", Style::default().fg(Color::Gray)),
                Span::raw(pct(run.f1_score)),
            ]),
            Line::from(vec![
                Span::styled("Predictions: ", Style::default().fg(Color::Gray)),
                Span::raw(format!(
                    "{} ({} exoplanets, {} false positives)",
                    run.total_predictions, run.exoplanet_count, run.false_positive_count
                )),
            ]),
            Line::from(vec![
                Span::styled("Execution time: ", Style::default().fg(Color::Gray)),
                Span::raw(format!("{} ms", run.execution_time)),
            ]),
            Line::from(vec![
                Span::styled("Completed: ", Style::default().fg(Color::Gray)),
                Span::raw(run.completed_at.clone().unwrap_or_else(|| "-".into())),
            ]),
        ],
        None => vec![Line::from("No model runs recorded")],
    };
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Latest Model Run"),
    );
    f.render_widget(p, area);
}

fn draw_datasets(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let mut lines = Vec::new();
    if state.datasets.is_empty() {
        lines.push(Line::from("No datasets uploaded yet"));
        lines.push(Line::from(Span::styled(
            "Upload one with: exoscan --file <dataset.csv>",
            Style::default().fg(Color::Gray),
        )));
    }
    for (i, ds) in state.datasets.iter().enumerate().skip(state.scroll_offset) {
        let marker = if i == state.selected { "> " } else { "  " };
        let status = if state.analyzing.as_deref() == Some(ds.id.as_str()) {
            Span::styled("Analyzing…", Style::default().fg(Color::Yellow))
        } else if ds.processed {
            Span::styled("Analyzed", Style::default().fg(Color::Green))
        } else {
            Span::styled("Pending", Style::default().fg(Color::DarkGray))
        };
        let row_style = if i == state.selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, row_style),
            Span::styled(format!("{:<28} ", truncate(&ds.name, 28)), row_style),
            Span::styled(format!("{:<8} ", ds.mission_source), row_style),
            Span::raw(format!("{:>9} samples  ", ds.total_samples)),
            status,
        ]));
    }
    let list = Paragraph::new(lines).block(
        Block::default().borders(Borders::ALL).title(format!(
            "Datasets ({})  [a analyze | d delete | e/c export | r refresh]",
            state.datasets.len()
        )),
    );
    f.render_widget(list, main[0]);

    draw_status(main[1], f, state);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = vec![
        Span::styled("Info: ", Style::default().fg(Color::Gray)),
        Span::raw(state.info.clone()),
    ];
    if let Some(active) = &state.analyzing {
        let name = state
            .datasets
            .iter()
            .find(|d| &d.id == active)
            .map(|d| d.name.as_str())
            .unwrap_or(active.as_str());
        spans.push(Span::raw("   "));
        spans.push(Span::styled("Analyzing: ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(name.to_string(), Style::default().fg(Color::Yellow)));
    }
    let status = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
