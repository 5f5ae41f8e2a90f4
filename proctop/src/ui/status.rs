//! Bottom status line: open editor prompt, or refresh state and key hints.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::input::Editor;
use crate::ui::theme::NOTICE_FG;
use crate::ui::util::fmt_interval;
use crate::view::StatusView;

const HINTS: &str =
    "Tab/1/2 tabs  [ ] host  m host search  / search  c cpu  M mem  s sort  x clear  r refresh  a auto  +/- interval";

pub fn status_line(status: &StatusView, editor: Option<&Editor>) -> Line<'static> {
    if let Some(ed) = editor {
        return Line::from(vec![
            Span::styled(
                format!("{}: ", ed.field.label()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(ed.buffer.clone()),
            Span::styled("▏", Style::default().fg(Color::Cyan)),
            Span::styled(
                "   Enter apply  Esc cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ]);
    }

    let auto = if status.auto_refresh {
        format!("auto {}", fmt_interval(status.interval_ms))
    } else {
        "auto off".to_string()
    };
    let mut spans = vec![
        Span::styled(auto, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "  last {}",
            status.last_refresh.as_deref().unwrap_or("never")
        )),
    ];
    if let Some(notice) = &status.notice {
        spans.push(Span::styled(
            format!("  {notice}"),
            Style::default().fg(NOTICE_FG),
        ));
    }
    spans.push(Span::styled(
        format!("  {HINTS}"),
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

pub fn draw_status(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    status: &StatusView,
    editor: Option<&Editor>,
) {
    f.render_widget(Paragraph::new(status_line(status, editor)), area);
}
