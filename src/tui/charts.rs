use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph},
    Frame,
};

use crate::model::{Stage, STAGES};

/// Render one waveform array as a line chart.
///
/// Waveforms are sine sweeps with +-0.25 jitter, so fixed y bounds keep the
/// trace steady between snapshots.
pub fn render_waveform(f: &mut Frame, area: Rect, label: &str, samples: &[f64], color: Color) {
    let points: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();

    let ds = Dataset::default()
        .graph_type(GraphType::Line)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(color))
        .data(&points);

    let chart = Chart::new(vec![ds])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(Span::styled(
                    label.to_string(),
                    Style::default().fg(color),
                ))),
        )
        .x_axis(Axis::default().bounds([0.0, points.len().max(1) as f64]))
        .y_axis(Axis::default().bounds([-1.5, 1.5]));
    f.render_widget(chart, area);
}

/// Render the four-stage tracker: done stages green, the active one yellow.
pub fn render_stage_tracker(f: &mut Frame, area: Rect, current: Stage) {
    let current_index = current.index();
    let mut lines = Vec::new();
    for (i, stage) in STAGES.iter().enumerate() {
        let (marker, style) = if i < current_index {
            ("[done]", Style::default().fg(Color::Green))
        } else if i == current_index {
            ("[ >> ]", Style::default().fg(Color::Yellow))
        } else {
            ("[    ]", Style::default().fg(Color::DarkGray))
        };
        lines.push(Line::from(vec![
            Span::styled(marker, style),
            Span::raw(" "),
            Span::styled(stage.label(), style),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Stages"));
    f.render_widget(p, area);
}

/// Render the overall progress gauge.
pub fn render_progress_gauge(f: &mut Frame, area: Rect, progress: u8) {
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(u16::from(progress.min(100)));
    f.render_widget(gauge, area);
}

/// Render one summary card: a big value over a dim label.
pub fn render_summary_card(f: &mut Frame, area: Rect, label: &str, value: String, color: Color) {
    let p = Paragraph::new(vec![
        Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(ratatui::style::Modifier::BOLD),
        )),
        Line::from(Span::styled(
            label.to_string(),
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}
