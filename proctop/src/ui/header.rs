//! Top header with the selected host, its last report time and process count.

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

use crate::view::HeaderView;

pub fn header_title(h: &HeaderView) -> String {
    match (&h.hostname, &h.last_updated) {
        (Some(host), Some(updated)) => {
            let skipped = if h.skipped > 0 {
                format!(" ({} malformed skipped)", h.skipped)
            } else {
                String::new()
            };
            format!(
                "proctop — host: {host} | updated: {updated} | {} processes{skipped}  (press 'q' to quit)",
                h.process_count
            )
        }
        (Some(host), None) => format!("proctop — host: {host} (not reported)  (press 'q' to quit)"),
        _ => "proctop — waiting for data... (press 'q' to quit)".into(),
    }
}

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, h: &HeaderView) {
    f.render_widget(
        Block::default()
            .title(header_title(h))
            .borders(Borders::BOTTOM),
        area,
    );
}
