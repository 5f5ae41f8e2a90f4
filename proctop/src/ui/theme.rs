//! Shared UI theme constants.

use ratatui::style::Color;

// Scrollbar colors
pub const SB_ARROW: Color = Color::Rgb(170, 170, 180);
pub const SB_TRACK: Color = Color::Rgb(170, 170, 180);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);

pub const SELECTED_BG: Color = Color::DarkGray;
pub const HEADER_FG: Color = Color::Cyan;
pub const GUIDE_FG: Color = Color::Yellow;
pub const NOTICE_FG: Color = Color::Red;

pub fn cpu_color(v: f32) -> Color {
    match v {
        x if x < 25.0 => Color::Green,
        x if x < 60.0 => Color::Yellow,
        _ => Color::Red,
    }
}

pub fn mem_color(v: f32) -> Color {
    match v {
        x if x < 5.0 => Color::Blue,
        x if x < 20.0 => Color::Magenta,
        _ => Color::Red,
    }
}
