//! Keyboard bindings: crossterm key events to typed commands and actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::Action;
use crate::filter::FilterUpdate;
use crate::state::{AppState, Tab};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    MachineSearch,
    ProcessSearch,
    MinCpu,
    MinMem,
}

impl EditField {
    pub fn label(self) -> &'static str {
        match self {
            EditField::MachineSearch => "Machine search",
            EditField::ProcessSearch => "Process search",
            EditField::MinCpu => "Min CPU %",
            EditField::MinMem => "Min Mem %",
        }
    }

    fn is_live(self) -> bool {
        matches!(self, EditField::MachineSearch | EditField::ProcessSearch)
    }

    fn current(self, state: &AppState) -> String {
        match self {
            EditField::MachineSearch => state.machine_search.clone(),
            EditField::ProcessSearch => state.filter.search.clone(),
            EditField::MinCpu => fmt_threshold(state.filter.min_cpu),
            EditField::MinMem => fmt_threshold(state.filter.min_mem),
        }
    }

    fn action(self, text: &str) -> Option<Action> {
        match self {
            EditField::MachineSearch => Some(Action::SetMachineSearch(text.to_string())),
            EditField::ProcessSearch => Some(Action::UpdateFilter(FilterUpdate {
                search: Some(text.to_string()),
                ..Default::default()
            })),
            EditField::MinCpu => parse_threshold(text).map(|v| {
                Action::UpdateFilter(FilterUpdate {
                    min_cpu: Some(v),
                    ..Default::default()
                })
            }),
            EditField::MinMem => parse_threshold(text).map(|v| {
                Action::UpdateFilter(FilterUpdate {
                    min_mem: Some(v),
                    ..Default::default()
                })
            }),
        }
    }
}

fn fmt_threshold(v: f32) -> String {
    if v == 0.0 {
        String::new()
    } else {
        format!("{v}")
    }
}

/// Empty means 0; negative clamps to 0; garbage is rejected.
fn parse_threshold(text: &str) -> Option<f32> {
    let t = text.trim();
    if t.is_empty() {
        return Some(0.0);
    }
    t.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
}

/// An open text box. Search boxes apply on every keystroke; numeric boxes on Enter.
#[derive(Debug, Clone, PartialEq)]
pub struct Editor {
    pub field: EditField,
    pub buffer: String,
    original: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Editing(Option<Action>),
    Closed(Option<Action>),
}

impl Editor {
    pub fn open(field: EditField, state: &AppState) -> Self {
        let current = field.current(state);
        Self {
            field,
            buffer: current.clone(),
            original: current,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditOutcome {
        match key.code {
            KeyCode::Esc => {
                let restore = if self.field.is_live() && self.buffer != self.original {
                    self.field.action(&self.original)
                } else {
                    None
                };
                EditOutcome::Closed(restore)
            }
            KeyCode::Enter => {
                if self.field.is_live() {
                    EditOutcome::Closed(None)
                } else {
                    EditOutcome::Closed(self.field.action(&self.buffer))
                }
            }
            KeyCode::Backspace => {
                if self.buffer.pop().is_some() && self.field.is_live() {
                    EditOutcome::Editing(self.field.action(&self.buffer))
                } else {
                    EditOutcome::Editing(None)
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if !self.field.is_live() && !(c.is_ascii_digit() || c == '.') {
                    return EditOutcome::Editing(None);
                }
                self.buffer.push(c);
                if self.field.is_live() {
                    EditOutcome::Editing(self.field.action(&self.buffer))
                } else {
                    EditOutcome::Editing(None)
                }
            }
            _ => EditOutcome::Editing(None),
        }
    }
}

/// What a key press means outside of an open editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Apply(Action),
    Edit(EditField),
    MoveCursor(isize),
    CursorHome,
    CursorEnd,
    ToggleAtCursor,
    None,
}

pub fn map_key(key: KeyEvent, state: &AppState) -> Command {
    let auto = state.auto_refresh;
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Command::Apply(Action::Quit)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Command::Apply(Action::Quit),
        KeyCode::Tab => Command::Apply(Action::SetTab(state.active_tab.toggle())),
        KeyCode::Char('1') => Command::Apply(Action::SetTab(Tab::Processes)),
        KeyCode::Char('2') => Command::Apply(Action::SetTab(Tab::Resources)),
        KeyCode::Char('[') | KeyCode::PageUp => state
            .neighbor_machine(-1)
            .map(|h| Command::Apply(Action::SelectMachine(h)))
            .unwrap_or(Command::None),
        KeyCode::Char(']') | KeyCode::PageDown => state
            .neighbor_machine(1)
            .map(|h| Command::Apply(Action::SelectMachine(h)))
            .unwrap_or(Command::None),
        KeyCode::Char('m') => Command::Edit(EditField::MachineSearch),
        KeyCode::Char('/') => Command::Edit(EditField::ProcessSearch),
        KeyCode::Char('c') => Command::Edit(EditField::MinCpu),
        KeyCode::Char('M') => Command::Edit(EditField::MinMem),
        KeyCode::Char('s') => Command::Apply(Action::UpdateFilter(FilterUpdate {
            sort_key: Some(state.filter.sort_key.next()),
            ..Default::default()
        })),
        KeyCode::Char('x') => Command::Apply(Action::ClearFilters),
        KeyCode::Char('r') => Command::Apply(Action::RefreshNow),
        KeyCode::Char('a') => Command::Apply(Action::SetAutoRefresh {
            enabled: !auto.enabled,
            interval_ms: auto.interval_ms,
        }),
        KeyCode::Char('+') | KeyCode::Char('=') => Command::Apply(Action::SetAutoRefresh {
            enabled: auto.enabled,
            interval_ms: auto.stepped_interval(true),
        }),
        KeyCode::Char('-') => Command::Apply(Action::SetAutoRefresh {
            enabled: auto.enabled,
            interval_ms: auto.stepped_interval(false),
        }),
        KeyCode::Up | KeyCode::Char('k') => Command::MoveCursor(-1),
        KeyCode::Down | KeyCode::Char('j') => Command::MoveCursor(1),
        KeyCode::Home => Command::CursorHome,
        KeyCode::End => Command::CursorEnd,
        KeyCode::Char(' ') | KeyCode::Enter => Command::ToggleAtCursor,
        _ => Command::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortKey;
    use crate::types::MachineSnapshot;
    use chrono::Utc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn with_machines() -> AppState {
        let mut s = AppState::default();
        s.refresh_completed(vec![
            MachineSnapshot::new("alpha", Utc::now(), Vec::new()),
            MachineSnapshot::new("beta", Utc::now(), Vec::new()),
        ]);
        s
    }

    #[test]
    fn quit_keys() {
        let s = AppState::default();
        assert_eq!(map_key(key(KeyCode::Char('q')), &s), Command::Apply(Action::Quit));
        assert_eq!(map_key(key(KeyCode::Esc), &s), Command::Apply(Action::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c, &s), Command::Apply(Action::Quit));
    }

    #[test]
    fn machine_navigation_selects_neighbors() {
        let s = with_machines();
        assert_eq!(
            map_key(key(KeyCode::Char(']')), &s),
            Command::Apply(Action::SelectMachine("beta".into()))
        );
        assert_eq!(
            map_key(key(KeyCode::PageUp), &s),
            Command::Apply(Action::SelectMachine("alpha".into()))
        );
        assert_eq!(map_key(key(KeyCode::Char(']')), &AppState::default()), Command::None);
    }

    #[test]
    fn sort_key_cycles_from_current() {
        let mut s = AppState::default();
        s.filter.sort_key = SortKey::Name;
        assert_eq!(
            map_key(key(KeyCode::Char('s')), &s),
            Command::Apply(Action::UpdateFilter(FilterUpdate {
                sort_key: Some(SortKey::Pid),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn auto_refresh_controls() {
        let s = AppState::default();
        assert_eq!(
            map_key(key(KeyCode::Char('a')), &s),
            Command::Apply(Action::SetAutoRefresh {
                enabled: false,
                interval_ms: 10_000
            })
        );
        assert_eq!(
            map_key(key(KeyCode::Char('+')), &s),
            Command::Apply(Action::SetAutoRefresh {
                enabled: true,
                interval_ms: 30_000
            })
        );
    }

    #[test]
    fn search_editor_applies_live_and_restores_on_escape() {
        let mut s = AppState::default();
        s.filter.search = "ss".into();
        let mut ed = Editor::open(EditField::ProcessSearch, &s);
        assert_eq!(ed.buffer, "ss");
        let out = ed.handle_key(key(KeyCode::Char('h')));
        assert_eq!(
            out,
            EditOutcome::Editing(Some(Action::UpdateFilter(FilterUpdate {
                search: Some("ssh".into()),
                ..Default::default()
            })))
        );
        let out = ed.handle_key(key(KeyCode::Esc));
        assert_eq!(
            out,
            EditOutcome::Closed(Some(Action::UpdateFilter(FilterUpdate {
                search: Some("ss".into()),
                ..Default::default()
            })))
        );
    }

    #[test]
    fn numeric_editor_applies_on_enter_only() {
        let s = AppState::default();
        let mut ed = Editor::open(EditField::MinCpu, &s);
        assert_eq!(ed.buffer, "");
        assert_eq!(ed.handle_key(key(KeyCode::Char('1'))), EditOutcome::Editing(None));
        assert_eq!(ed.handle_key(key(KeyCode::Char('x'))), EditOutcome::Editing(None));
        assert_eq!(ed.handle_key(key(KeyCode::Char('.'))), EditOutcome::Editing(None));
        assert_eq!(ed.handle_key(key(KeyCode::Char('5'))), EditOutcome::Editing(None));
        assert_eq!(ed.buffer, "1.5");
        assert_eq!(
            ed.handle_key(key(KeyCode::Enter)),
            EditOutcome::Closed(Some(Action::UpdateFilter(FilterUpdate {
                min_cpu: Some(1.5),
                ..Default::default()
            })))
        );
    }

    #[test]
    fn numeric_editor_rejects_garbage() {
        let s = AppState::default();
        let mut ed = Editor::open(EditField::MinMem, &s);
        ed.buffer = "1..2".into();
        assert_eq!(ed.handle_key(key(KeyCode::Enter)), EditOutcome::Closed(None));
    }

    #[test]
    fn threshold_parsing() {
        assert_eq!(parse_threshold(""), Some(0.0));
        assert_eq!(parse_threshold(" 2.5 "), Some(2.5));
        assert_eq!(parse_threshold("-3"), Some(0.0));
        assert_eq!(parse_threshold("abc"), None);
    }
}
