//! Machine list with search and selection highlight.

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::SELECTED_BG;
use crate::ui::util::truncate_middle;
use crate::view::MachineEntry;

pub fn draw_machines(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    machines: &[MachineEntry],
    search: &str,
) {
    let title = if search.is_empty() {
        format!("Machines ({})", machines.len())
    } else {
        format!("Machines [{search}]")
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let width = area.width.saturating_sub(2) as usize;

    let lines: Vec<Line> = machines
        .iter()
        .map(|m| {
            let marker = if m.selected { "▶ " } else { "  " };
            let count = format!(" {}", m.process_count);
            let name_width = width.saturating_sub(marker.chars().count() + count.len());
            let text = format!(
                "{marker}{:<name_width$}{count}",
                truncate_middle(&m.hostname, name_width)
            );
            let style = if m.selected {
                Style::default()
                    .bg(SELECTED_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(text, style))
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Index of the machine entry under a left click, if any.
pub fn machines_hit_test(mouse: MouseEvent, area: Rect, len: usize) -> Option<usize> {
    if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
        return None;
    }
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    let inside = mouse.column >= inner.x
        && mouse.column < inner.x + inner.width
        && mouse.row >= inner.y
        && mouse.row < inner.y + inner.height;
    if !inside {
        return None;
    }
    let idx = (mouse.row - inner.y) as usize;
    (idx < len).then_some(idx)
}
