//! Process outline: toolbar, sortable header, collapsible tree rows and a scrollbar.

use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::filter::SortKey;
use crate::ui::theme::{cpu_color, mem_color, GUIDE_FG, HEADER_FG, SELECTED_BG};
use crate::ui::util::{draw_scrollbar, fmt_pct, follow_cursor};
use crate::view::{OutlineRow, Toolbar};

// Keep the header widths here so drawing and hit-testing match.
const COLS: [Constraint; 4] = [
    Constraint::Length(8), // PID
    Constraint::Min(20),   // Name (tree)
    Constraint::Length(8), // CPU %
    Constraint::Length(8), // Mem %
];

pub fn toolbar_line(t: &Toolbar) -> Line<'static> {
    let search = if t.search.is_empty() {
        "-".to_string()
    } else {
        t.search.clone()
    };
    let label = Style::default().fg(Color::DarkGray);
    Line::from(vec![
        Span::styled("Search ", label),
        Span::raw(search),
        Span::styled("  Min CPU ", label),
        Span::raw(format!("{}", t.min_cpu)),
        Span::styled("  Min Mem ", label),
        Span::raw(format!("{}", t.min_mem)),
        Span::styled("  Sort ", label),
        Span::raw(t.sort_key.to_string()),
        Span::raw("   "),
        Span::styled(t.counter(), Style::default().add_modifier(Modifier::BOLD)),
    ])
}

/// Draw toolbar + outline; `scroll` is adjusted to keep `cursor` visible.
/// Returns the rows area (below the header) for mouse handling.
pub fn draw_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    toolbar: &Toolbar,
    rows: &[OutlineRow],
    cursor: usize,
    scroll: &mut usize,
) -> Rect {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);
    f.render_widget(Paragraph::new(toolbar_line(toolbar)), parts[0]);

    let block = Block::default().borders(Borders::ALL).title("Processes");
    f.render_widget(block, parts[1]);

    let inner = Rect {
        x: parts[1].x + 1,
        y: parts[1].y + 1,
        width: parts[1].width.saturating_sub(2),
        height: parts[1].height.saturating_sub(2),
    };
    if inner.height < 2 || inner.width < 3 {
        return Rect::default();
    }
    // Reserve 2 columns for the scrollbar.
    let content = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.saturating_sub(2),
        height: inner.height,
    };

    let viewport_rows = content.height.saturating_sub(1) as usize;
    *scroll = follow_cursor(*scroll, cursor, viewport_rows);
    *scroll = (*scroll).min(rows.len().saturating_sub(viewport_rows));
    let offset = *scroll;

    let body = rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(viewport_rows)
        .map(|(i, r)| outline_row(r, i == cursor));

    let sort = toolbar.sort_key;
    let mark = |key: SortKey, label: &'static str| -> String {
        if sort == key {
            format!("{label} •")
        } else {
            label.to_string()
        }
    };
    let header = Row::new(vec![
        mark(SortKey::Pid, "PID"),
        mark(SortKey::Name, "Name"),
        mark(SortKey::Cpu, "CPU %"),
        mark(SortKey::Mem, "Mem %"),
    ])
    .style(
        Style::default()
            .fg(HEADER_FG)
            .add_modifier(Modifier::BOLD),
    );

    let table = Table::new(body, COLS.to_vec())
        .header(header)
        .column_spacing(1);
    f.render_widget(table, content);

    let scroll_area = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    draw_scrollbar(f, scroll_area, rows.len(), viewport_rows, offset);

    Rect {
        x: content.x,
        y: content.y + 1,
        width: content.width,
        height: content.height.saturating_sub(1),
    }
}

fn outline_row(r: &OutlineRow, at_cursor: bool) -> Row<'static> {
    let fold = match (r.has_children, r.expanded) {
        (false, _) => "  ",
        (true, true) => "▾ ",
        (true, false) => "▸ ",
    };
    let name = Line::from(vec![
        Span::styled(r.guide.clone(), Style::default().fg(GUIDE_FG)),
        Span::raw(fold),
        Span::raw(r.name.clone()),
    ]);
    let style = if at_cursor {
        Style::default().bg(SELECTED_BG)
    } else {
        Style::default()
    };
    Row::new(vec![
        Cell::from(r.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
        Cell::from(name),
        Cell::from(fmt_pct(r.cpu_usage)).style(Style::default().fg(cpu_color(r.cpu_usage))),
        Cell::from(fmt_pct(r.memory_usage))
            .style(Style::default().fg(mem_color(r.memory_usage))),
    ])
    .style(style)
}

/// Outline row index under `row` (terminal line), given the area returned by
/// [`draw_processes`] and the scroll offset used to draw it.
pub fn outline_hit_test(row: u16, rows_area: Rect, scroll: usize, len: usize) -> Option<usize> {
    if row < rows_area.y || row >= rows_area.y + rows_area.height {
        return None;
    }
    let idx = scroll + (row - rows_area.y) as usize;
    (idx < len).then_some(idx)
}
