//! UI module root: lays out the dashboard and draws each panel.

pub mod header;
pub mod machines;
pub mod processes;
pub mod resources;
pub mod status;
pub mod theme;
pub mod util;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Tabs},
};

use crate::input::Editor;
use crate::state::Tab;
use crate::view::{Body, DashboardView};

/// Areas of the last frame that mouse handling needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Areas {
    pub machines: Rect,
    /// Outline rows (below the table header); empty when not on the processes tab.
    pub outline: Rect,
}

pub fn draw(
    f: &mut ratatui::Frame<'_>,
    view: &DashboardView,
    editor: Option<&Editor>,
    cursor: usize,
    outline_scroll: &mut usize,
) -> Areas {
    let area = f.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(6),    // machines + tab body
            Constraint::Length(1), // status
        ])
        .split(area);

    header::draw_header(f, rows[0], &view.header);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(30)])
        .split(rows[1]);

    machines::draw_machines(f, cols[0], &view.machines, &view.machine_search);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(4)])
        .split(cols[1]);

    let selected = match view.active_tab {
        Tab::Processes => 0,
        Tab::Resources => 1,
    };
    let tabs = Tabs::new(vec![Line::from("1 Processes"), Line::from("2 Resources")])
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, right[0]);

    let mut outline = Rect::default();
    match &view.body {
        Body::Empty => {
            let msg = if view.header.hostname.is_some() {
                "No data for this machine."
            } else {
                "No machine selected."
            };
            f.render_widget(
                Paragraph::new(msg).block(Block::default().borders(Borders::ALL)),
                right[1],
            );
        }
        Body::Processes { toolbar, rows } => {
            outline = processes::draw_processes(
                f,
                right[1],
                toolbar,
                rows,
                cursor,
                outline_scroll,
            );
        }
        Body::Resources(summary) => resources::draw_resources(f, right[1], summary),
    }

    status::draw_status(f, rows[2], &view.status, editor);

    Areas {
        machines: cols[0],
        outline,
    }
}
