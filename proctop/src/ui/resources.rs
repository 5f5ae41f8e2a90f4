//! Resources tab: totals plus the top CPU and memory consumers.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
};

use crate::resources::{ResourceSummary, TOP_N};
use crate::types::ProcessRecord;
use crate::ui::theme::{cpu_color, mem_color, HEADER_FG};
use crate::ui::util::fmt_pct;

pub fn summary_lines(s: &ResourceSummary) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    vec![
        Line::from(vec![
            Span::styled("Processes   ", label),
            Span::raw(s.process_count.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Total CPU   ", label),
            Span::raw(format!("{:.1}%", s.total_cpu)),
        ]),
        Line::from(vec![
            Span::styled("Total Mem   ", label),
            Span::raw(format!("{:.1}%", s.total_mem)),
        ]),
        Line::from(Span::styled(
            "Memory is the sum of per-process shares and may exceed 100%.",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ]
}

pub fn draw_resources(f: &mut ratatui::Frame<'_>, area: Rect, s: &ResourceSummary) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(4)])
        .split(area);

    f.render_widget(
        Paragraph::new(summary_lines(s))
            .block(Block::default().borders(Borders::ALL).title("Summary")),
        rows[0],
    );

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    draw_top(f, cols[0], &format!("Top {TOP_N} CPU"), &s.top_cpu, true);
    draw_top(f, cols[1], &format!("Top {TOP_N} Mem"), &s.top_mem, false);
}

fn draw_top(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    procs: &[ProcessRecord],
    by_cpu: bool,
) {
    let body = procs.iter().map(|p| {
        let (v, color) = if by_cpu {
            (p.cpu_usage, cpu_color(p.cpu_usage))
        } else {
            (p.memory_usage, mem_color(p.memory_usage))
        };
        Row::new(vec![
            Span::styled(p.pid.to_string(), Style::default().fg(Color::DarkGray)),
            Span::raw(p.name.clone()),
            Span::styled(fmt_pct(v), Style::default().fg(color)),
        ])
    });
    let header = Row::new(vec!["PID", "Name", if by_cpu { "CPU %" } else { "Mem %" }])
        .style(Style::default().fg(HEADER_FG).add_modifier(Modifier::BOLD));
    let table = Table::new(
        body,
        [
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .column_spacing(1)
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(table, area);
}
