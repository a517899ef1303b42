//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────┐
//! │  maintwatch   http://127.0.0.1:5000   #42     │
//! ├─────────────────────┬────────────────────────┤
//! │  Latest reading     │  Window features       │
//! │  vibration  0.61 g  │  mean_vibration 0.598  │
//! │  ...                │  ...                   │
//! ├─────────────────────┴────────────────────────┤
//! │  OK  confidence 0.923                         │
//! ├──────────────────────────────────────────────┤
//! │  ╭ vibration (g)                              │
//! │  │  ~~~~~~~~~~                                │
//! │  ╰─────────────────                           │
//! ├──────────────────────────────────────────────┤
//! │  space: pause   c: channel   r: refresh   q   │
//! └──────────────────────────────────────────────┘

use super::app::App;
use crate::dashboard::DashboardState;
use maintwatch_core::{Channel, FEATURE_LAYOUT};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &App, state: &DashboardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(6), // reading + features
            Constraint::Length(3), // decision
            Constraint::Min(8),    // chart
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app, state);
    draw_panels(f, rows[1], state);
    draw_decision(f, rows[2], state);
    draw_chart(f, rows[3], app, state);
    draw_keys(f, rows[4]);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App, state: &DashboardState) {
    let spin = if app.is_collecting() { " ⟳" } else { "" };
    let paused = if app.is_paused() { "  PAUSED" } else { "" };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" maintwatch ", Style::default().bold().fg(Color::Cyan)),
            Span::raw("  server: "),
            Span::styled(app.base_url(), Style::default().bold().fg(Color::Yellow)),
            Span::styled(
                format!(
                    "  #{}  every {}ms  {} failed{spin}{paused} ",
                    state.ticks(),
                    app.refresh_rate().as_millis(),
                    state.failures()
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

    f.render_widget(block, area);
}

fn unavailable(reason: Option<&str>) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            "unavailable",
            Style::default().bold().fg(Color::Red),
        )),
        Line::from(Span::styled(
            reason.unwrap_or("waiting for first poll").to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

fn draw_panels(f: &mut Frame, area: Rect, state: &DashboardState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let reading_lines: Vec<Line> = match state.reading() {
        Some(r) => Channel::ALL
            .iter()
            .map(|&c| {
                Line::from(vec![
                    Span::styled(format!("{:<12}", c.to_string()), Style::default().bold()),
                    Span::raw(format!("{:>10.3} {}", r.value(c), c.unit())),
                ])
            })
            .collect(),
        None => unavailable(state.reading_error()),
    };
    let p = Paragraph::new(reading_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Latest reading "));
    f.render_widget(p, cols[0]);

    let feature_lines: Vec<Line> = match state.features() {
        Some(v) => FEATURE_LAYOUT
            .iter()
            .zip(v.to_array())
            .map(|(name, value)| {
                Line::from(vec![
                    Span::styled(format!("{name:<16}"), Style::default().bold()),
                    Span::raw(format!("{value:>10.4}")),
                ])
            })
            .collect(),
        None => unavailable(Some("no readings in window")),
    };
    let p = Paragraph::new(feature_lines)
        .block(Block::default().borders(Borders::ALL).title(" Window features "));
    f.render_widget(p, cols[1]);
}

fn draw_decision(f: &mut Frame, area: Rect, state: &DashboardState) {
    let (label, style) = match state.prediction() {
        Some(p) if p.maintenance_needed => (
            format!(
                "MAINTENANCE NEEDED  confidence {}",
                crate::commands::format_confidence(p.confidence)
            ),
            Style::default().bold().fg(Color::Black).bg(Color::Red),
        ),
        Some(p) => (
            format!(
                "OK  confidence {}",
                crate::commands::format_confidence(p.confidence)
            ),
            Style::default().bold().fg(Color::Green),
        ),
        None => (state.status_label(), Style::default().fg(Color::Yellow)),
    };
    let p = Paragraph::new(label)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(" Decision "));
    f.render_widget(p, area);
}

fn draw_chart(f: &mut Frame, area: Rect, app: &App, state: &DashboardState) {
    let channel = app.chart_channel();
    let history = state.history();

    if history.is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {channel} ({}) ", channel.unit()));
        let p = Paragraph::new("No readings received yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let data: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, point)| (i as f64, point.reading.value(channel)))
        .collect();

    let latest = data.last().map(|&(_, v)| v).unwrap_or(0.0);
    let min_val = data.iter().map(|&(_, v)| v).fold(f64::MAX, f64::min);
    let max_val = data.iter().map(|&(_, v)| v).fold(f64::MIN, f64::max);
    let pad = ((max_val - min_val) * 0.1).max(0.01);
    let y_min = min_val - pad;
    let y_max = max_val + pad;

    let datasets = vec![
        Dataset::default()
            .name(format!("{latest:.3}"))
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Cyan))
            .data(&data),
    ];

    let x_max = (history.len() as f64).max(10.0);
    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {channel} ({})  latest {latest:.3} ",
            channel.unit()
        )))
        .x_axis(Axis::default().bounds([0.0, x_max]).labels(vec![
            Line::from("0"),
            Line::from(format!("{}", history.len())),
        ]))
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from(format!("{y_min:.2}")),
            Line::from(format!("{y_max:.2}")),
        ]));

    f.render_widget(chart, area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(" space: pause   c: chart channel   r: refresh now   q: quit")
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
