//! The dashboard: grouped interface table, selected-interface detail
//! sparklines, header with fleet health, footer with key hints.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Paragraph, Row, Sparkline, Table, TableState},
};

use ifpulse_core::{InterfaceSnapshot, OperStatus, PollPhase, RateSample};

use crate::app::App;
use crate::widgets::rate_fmt::{fmt_bps, fmt_bps_short, fmt_util_bar};
use crate::widgets::sparkline::spark_string;

const SPARK_CELL_WIDTH: usize = 10;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(6),
        Constraint::Length(9),
        Constraint::Length(1),
    ])
    .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_table(frame, app, chunks[1]);
    render_detail(frame, app, chunks[2]);
    render_footer(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let (total, healthy) = app.poller.device_counts();
    let health_style = if healthy == total {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let line = Line::from(vec![
        Span::styled(" ifpulse ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("· "),
        Span::styled(format!("{healthy}/{total} devices"), health_style),
        Span::raw(format!(
            " · polling every {}",
            humantime::format_duration(app.poller.interval())
        )),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        "device", "interface", "status", "in", "out", "util", "in hist", "out hist",
    ])
    .style(Style::default().add_modifier(Modifier::UNDERLINED).dim());

    let mut rows: Vec<Row> = Vec::new();
    let mut selected_row = None;
    let mut flat_idx = 0usize;

    for group in &app.groups {
        rows.push(
            Row::new(vec![Cell::from(format!("▸ {}", group.name))])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        );
        for iface in &group.interfaces {
            if flat_idx == app.selected {
                selected_row = Some(rows.len());
            }
            rows.push(interface_row(iface));
            flat_idx += 1;
        }
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(12),
            Constraint::Min(10),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(selected_row);
    frame.render_stateful_widget(table, area, &mut state);
}

fn interface_row<'a>(iface: &'a InterfaceSnapshot) -> Row<'a> {
    let failed = !iface.last_poll_succeeded || iface.poll_error.is_some();

    let name = iface.alias.as_ref().map_or_else(
        || iface.interface_name.clone(),
        |alias| format!("{} ({alias})", iface.interface_name),
    );

    let status_cell = if failed {
        // Stale data, visibly flagged — the history stays on screen.
        Cell::from("stale!").style(Style::default().fg(Color::Red))
    } else if iface.phase == PollPhase::Polling {
        Cell::from("…").style(Style::default().dim())
    } else {
        let style = match iface.oper_status {
            OperStatus::Up => Style::default().fg(Color::Green),
            OperStatus::Down => Style::default().fg(Color::Red),
            OperStatus::Testing => Style::default().fg(Color::Yellow),
            OperStatus::Unknown => Style::default().dim(),
        };
        Cell::from(iface.oper_status.as_str()).style(style)
    };

    let (in_cell, out_cell) = match iface.latest {
        Some(sample) if sample.valid => (fmt_bps(sample.in_bps), fmt_bps(sample.out_bps)),
        _ => ("—".to_owned(), "—".to_owned()),
    };

    let util_cell = iface.utilization_percent().map_or_else(
        || "—".to_owned(),
        |pct| format!("{} {pct:>3.0}%", fmt_util_bar(pct, 6)),
    );

    let row = Row::new(vec![
        Cell::from(iface.label.clone()),
        Cell::from(name),
        status_cell,
        Cell::from(in_cell),
        Cell::from(out_cell),
        Cell::from(util_cell),
        Cell::from(spark_string(&direction_values(&iface.history, true), SPARK_CELL_WIDTH)),
        Cell::from(spark_string(&direction_values(&iface.history, false), SPARK_CELL_WIDTH)),
    ]);

    if failed {
        row.style(Style::default().fg(Color::DarkGray))
    } else {
        row
    }
}

/// One direction of a history as sparkline input; invalid samples
/// become `None` and render as gaps.
fn direction_values(history: &[RateSample], inbound: bool) -> Vec<Option<f64>> {
    history
        .iter()
        .map(|s| {
            s.valid
                .then_some(if inbound { s.in_bps } else { s.out_bps })
        })
        .collect()
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(iface) = app.selected_interface() else {
        frame.render_widget(
            Paragraph::new("no interfaces configured").dim(),
            area,
        );
        return;
    };

    let halves = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_direction_panel(frame, iface, true, halves[0]);
    render_direction_panel(frame, iface, false, halves[1]);
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::as_conversions
)]
fn render_direction_panel(frame: &mut Frame, iface: &InterfaceSnapshot, inbound: bool, area: Rect) {
    let (dir, current) = if inbound {
        ("in", iface.latest.filter(|s| s.valid).map(|s| s.in_bps))
    } else {
        ("out", iface.latest.filter(|s| s.valid).map(|s| s.out_bps))
    };

    let data: Vec<u64> = iface
        .history
        .iter()
        .map(|s| {
            if s.valid {
                (if inbound { s.in_bps } else { s.out_bps }).max(0.0) as u64
            } else {
                0
            }
        })
        .collect();
    let peak = data.iter().copied().max().unwrap_or(0);

    let peak_label = fmt_bps_short(peak as f64);
    let title = format!(
        " {}/{} {dir}: {} (peak {peak_label}) ",
        iface.label,
        iface.interface_name,
        current.map_or_else(|| "—".into(), fmt_bps),
    );

    let sparkline = Sparkline::default()
        .block(Block::bordered().title(title))
        .style(Style::default().fg(if inbound { Color::Cyan } else { Color::Magenta }))
        .data(&data);
    frame.render_widget(sparkline, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" quit · "),
        Span::styled("r", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" poll now · "),
        Span::styled("↑/↓", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" select · "),
        Span::styled("tab", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" next group"),
    ])
    .dim();
    frame.render_widget(Paragraph::new(line), area);
}
