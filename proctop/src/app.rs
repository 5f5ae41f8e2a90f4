//! App loop: owns the state, routes input and scheduler events, and draws.

use std::{io, time::Duration};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::action::{Action, Effect};
use crate::fetch::SnapshotFetcher;
use crate::input::{map_key, Command, EditOutcome, Editor};
use crate::scheduler::{RefreshScheduler, SchedulerEvent};
use crate::state::{AppState, AutoRefresh};
use crate::ui::{self, machines::machines_hit_test, processes::outline_hit_test, Areas};
use crate::view::DashboardView;

const WHEEL_STEP: isize = 3;

pub struct App {
    state: AppState,
    scheduler: RefreshScheduler,
    events: UnboundedReceiver<SchedulerEvent>,
    fetcher: SnapshotFetcher,

    // Outline cursor and scroll offset, as row indices.
    cursor: usize,
    outline_scroll: usize,
    editor: Option<Editor>,

    should_quit: bool,
    dirty: bool,
    // Cached from the last draw for mouse hit-testing.
    areas: Areas,
}

impl App {
    pub fn new(fetcher: SnapshotFetcher, auto_refresh: AutoRefresh) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(auto_refresh),
            scheduler: RefreshScheduler::new(tx),
            events,
            fetcher,
            cursor: 0,
            outline_scroll: 0,
            editor: None,
            should_quit: false,
            dirty: true,
            areas: Areas::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(&mut self) -> Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        info!(endpoint = %self.fetcher.endpoint(), "dashboard started");
        let res = self.event_loop(&mut terminal).await;

        // Teardown
        self.scheduler.cancel();
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, DisableMouseCapture, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    /// Initial fetch plus the first auto-refresh timer.
    fn start(&mut self) {
        self.scheduler.spawn_fetch(&self.fetcher, false);
        self.scheduler.reschedule(self.state.auto_refresh);
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<()> {
        self.start();
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                match event::read()? {
                    Event::Key(k) if k.kind == KeyEventKind::Press => self.handle_key(k),
                    Event::Mouse(m) => self.handle_mouse(m),
                    Event::Resize(_, _) => self.dirty = true,
                    _ => {}
                }
            }

            // Timer ticks and finished fetches
            while let Ok(ev) = self.events.try_recv() {
                self.handle_scheduler_event(ev);
            }

            if self.should_quit {
                break;
            }

            if self.dirty {
                let view = DashboardView::build(&self.state);
                self.clamp_cursor(view.outline().len());
                let editor = self.editor.as_ref();
                let cursor = self.cursor;
                let scroll = &mut self.outline_scroll;
                let mut areas = Areas::default();
                terminal.draw(|f| areas = ui::draw(f, &view, editor, cursor, scroll))?;
                self.areas = areas;
                self.dirty = false;
            }

            sleep(Duration::from_millis(40)).await;
        }
        Ok(())
    }

    /// Apply an action and carry out the effect the state asked for.
    pub fn dispatch(&mut self, action: Action) {
        let resets_outline = matches!(action, Action::SelectMachine(_));
        match self.state.apply(action) {
            Effect::None => {}
            Effect::Render => self.dirty = true,
            Effect::Reschedule => {
                self.scheduler.reschedule(self.state.auto_refresh);
                self.dirty = true;
            }
            Effect::Refresh => {
                let request = self.scheduler.spawn_fetch(&self.fetcher, false);
                debug!(request, "manual refresh");
            }
            Effect::Quit => self.should_quit = true,
        }
        if resets_outline {
            self.cursor = 0;
            self.outline_scroll = 0;
        }
    }

    pub fn handle_scheduler_event(&mut self, ev: SchedulerEvent) {
        match ev {
            SchedulerEvent::Tick { generation } => {
                if self.scheduler.on_tick(generation) {
                    self.scheduler.spawn_fetch(&self.fetcher, true);
                }
            }
            SchedulerEvent::Fetched { request, result } => {
                if !self.scheduler.on_fetched(request, self.state.auto_refresh) {
                    return;
                }
                let effect = match result {
                    Ok(machines) => {
                        debug!(request, machines = machines.len(), "refresh applied");
                        self.state.refresh_completed(machines)
                    }
                    Err(e) => {
                        warn!(request, error = %e, "refresh failed");
                        self.state.refresh_failed(e.to_string())
                    }
                };
                self.dirty |= effect == Effect::Render;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(editor) = self.editor.as_mut() {
            let action = match editor.handle_key(key) {
                EditOutcome::Editing(action) => action,
                EditOutcome::Closed(action) => {
                    self.editor = None;
                    action
                }
            };
            if let Some(action) = action {
                self.dispatch(action);
            }
            self.dirty = true;
            return;
        }

        match map_key(key, &self.state) {
            Command::Apply(action) => self.dispatch(action),
            Command::Edit(field) => {
                self.editor = Some(Editor::open(field, &self.state));
                self.dirty = true;
            }
            Command::MoveCursor(delta) => self.move_cursor(delta),
            Command::CursorHome => self.set_cursor(0),
            Command::CursorEnd => self.set_cursor(usize::MAX),
            Command::ToggleAtCursor => {
                if let Some(pid) = self.pid_at_cursor() {
                    self.dispatch(Action::ToggleNode(pid));
                }
            }
            Command::None => {}
        }
    }

    fn handle_mouse(&mut self, m: MouseEvent) {
        let visible = self.state.visible_machines().len();
        if let Some(idx) = machines_hit_test(m, self.areas.machines, visible) {
            let host = self
                .state
                .visible_machines()
                .get(idx)
                .map(|mm| mm.hostname.clone());
            if let Some(host) = host {
                self.dispatch(Action::SelectMachine(host));
            }
            return;
        }

        let area = self.areas.outline;
        let inside = m.column >= area.x
            && m.column < area.x + area.width
            && m.row >= area.y
            && m.row < area.y + area.height;
        if !inside {
            return;
        }
        match m.kind {
            MouseEventKind::ScrollUp => self.move_cursor(-WHEEL_STEP),
            MouseEventKind::ScrollDown => self.move_cursor(WHEEL_STEP),
            MouseEventKind::Down(MouseButton::Left) => {
                let len = self.outline_len();
                if let Some(idx) = outline_hit_test(m.row, area, self.outline_scroll, len) {
                    if idx == self.cursor {
                        if let Some(pid) = self.pid_at_cursor() {
                            self.dispatch(Action::ToggleNode(pid));
                        }
                    } else {
                        self.set_cursor(idx);
                    }
                }
            }
            _ => {}
        }
    }

    fn outline_len(&self) -> usize {
        DashboardView::build(&self.state).outline().len()
    }

    fn pid_at_cursor(&self) -> Option<u32> {
        DashboardView::build(&self.state)
            .outline()
            .get(self.cursor)
            .map(|r| r.pid)
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = if delta < 0 {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta as usize)
        };
        self.set_cursor(next);
    }

    fn set_cursor(&mut self, idx: usize) {
        self.cursor = idx;
        self.clamp_cursor(self.outline_len());
        self.dirty = true;
    }

    fn clamp_cursor(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::TransportError;
    use crate::types::{MachineSnapshot, ProcessRecord};
    use crate::view::Body;
    use chrono::Utc;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn app(enabled: bool) -> App {
        let fetcher = SnapshotFetcher::new("http://127.0.0.1:9").unwrap();
        App::new(
            fetcher,
            AutoRefresh {
                enabled,
                interval_ms: 10_000,
            },
        )
    }

    fn alpha() -> MachineSnapshot {
        MachineSnapshot::new(
            "alpha",
            Utc::now(),
            vec![
                ProcessRecord::new(1, None, "init", 0.1, 0.4),
                ProcessRecord::new(10, Some(1), "sshd", 0.0, 0.2),
                ProcessRecord::new(11, Some(10), "bash", 0.5, 0.3),
                ProcessRecord::new(12, Some(1), "nginx", 7.0, 2.0),
                ProcessRecord::new(50, None, "kworker", 0.0, 0.0),
            ],
        )
    }

    fn beta() -> MachineSnapshot {
        MachineSnapshot::new(
            "beta",
            Utc::now(),
            vec![ProcessRecord::new(1, None, "init", 0.0, 0.1)],
        )
    }

    fn deliver(a: &mut App, result: Result<Vec<MachineSnapshot>, TransportError>) -> u64 {
        let request = a.scheduler.begin_fetch(false);
        a.handle_scheduler_event(SchedulerEvent::Fetched { request, result });
        request
    }

    fn press(a: &mut App, code: KeyCode) {
        a.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn pids(a: &App) -> Vec<u32> {
        DashboardView::build(a.state())
            .outline()
            .iter()
            .map(|r| r.pid)
            .collect()
    }

    #[test]
    fn first_refresh_selects_first_machine_unfiltered() {
        let mut a = app(false);
        deliver(&mut a, Ok(vec![alpha(), beta()]));
        assert_eq!(a.state().selected.as_deref(), Some("alpha"));
        let view = DashboardView::build(a.state());
        let Body::Processes { toolbar, .. } = view.body else {
            panic!("expected processes body");
        };
        assert_eq!(toolbar.counter(), "Showing 5 of 5");
    }

    #[test]
    fn older_response_is_discarded() {
        let mut a = app(false);
        let older = a.scheduler.begin_fetch(false);
        let newer = a.scheduler.begin_fetch(false);
        a.handle_scheduler_event(SchedulerEvent::Fetched {
            request: newer,
            result: Ok(vec![beta()]),
        });
        a.handle_scheduler_event(SchedulerEvent::Fetched {
            request: older,
            result: Ok(vec![alpha()]),
        });
        assert_eq!(a.state().machines.len(), 1);
        assert_eq!(a.state().selected.as_deref(), Some("beta"));
    }

    #[test]
    fn failed_refresh_keeps_cache_and_sets_notice() {
        let mut a = app(false);
        deliver(&mut a, Ok(vec![alpha(), beta()]));
        deliver(
            &mut a,
            Err(TransportError::Status(reqwest::StatusCode::BAD_GATEWAY)),
        );
        assert_eq!(a.state().machines.len(), 2);
        assert_eq!(a.state().selected.as_deref(), Some("alpha"));
        assert!(a.state().notice.as_deref().unwrap().contains("502"));
    }

    #[test]
    fn search_editor_filters_live_and_escape_restores() {
        let mut a = app(false);
        deliver(&mut a, Ok(vec![alpha()]));
        press(&mut a, KeyCode::Char('/'));
        for c in "bash".chars() {
            press(&mut a, KeyCode::Char(c));
        }
        assert_eq!(pids(&a), vec![1, 10, 11]);
        press(&mut a, KeyCode::Esc);
        assert!(a.editor.is_none());
        assert_eq!(pids(&a).len(), 5);
        // Esc closed the editor; it did not quit.
        assert!(!a.should_quit);
    }

    #[test]
    fn cursor_toggles_node_under_it() {
        let mut a = app(false);
        deliver(&mut a, Ok(vec![alpha()]));
        press(&mut a, KeyCode::Down);
        press(&mut a, KeyCode::Char(' '));
        assert_eq!(pids(&a), vec![1, 10, 12, 50]);
        press(&mut a, KeyCode::End);
        assert_eq!(a.cursor, 3);
        press(&mut a, KeyCode::Down);
        assert_eq!(a.cursor, 3);
        press(&mut a, KeyCode::Home);
        assert_eq!(a.cursor, 0);
    }

    #[test]
    fn switching_machine_resets_cursor() {
        let mut a = app(false);
        deliver(&mut a, Ok(vec![alpha(), beta()]));
        press(&mut a, KeyCode::Down);
        press(&mut a, KeyCode::Down);
        press(&mut a, KeyCode::Char(']'));
        assert_eq!(a.state().selected.as_deref(), Some("beta"));
        assert_eq!(a.cursor, 0);
    }

    #[test]
    fn quit_key_stops_loop() {
        let mut a = app(false);
        press(&mut a, KeyCode::Char('q'));
        assert!(a.should_quit);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_refresh_keys_drive_scheduler() {
        let mut a = app(false);
        assert_eq!(a.scheduler.pending(), 0);
        press(&mut a, KeyCode::Char('a'));
        assert!(a.state().auto_refresh.enabled);
        assert_eq!(a.scheduler.pending(), 1);
        press(&mut a, KeyCode::Char('-'));
        assert_eq!(a.state().auto_refresh.interval_ms, 5_000);
        assert_eq!(a.scheduler.pending(), 1);
        press(&mut a, KeyCode::Char('a'));
        assert_eq!(a.scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_auto_refresh_keeps_timer_and_skips_redraw() {
        let mut a = app(false);
        press(&mut a, KeyCode::Char('a'));
        assert_eq!(a.scheduler.pending(), 1);
        a.dirty = false;
        let auto = a.state().auto_refresh;
        a.dispatch(Action::SetAutoRefresh {
            enabled: auto.enabled,
            interval_ms: auto.interval_ms,
        });
        assert!(!a.dirty);
        assert_eq!(a.scheduler.pending(), 1);
        let tab = a.state().active_tab;
        a.dispatch(Action::SetTab(tab));
        assert!(!a.dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_starts_fetch_and_failure_rearms() {
        let mut a = app(true);
        let auto = a.state().auto_refresh;
        a.scheduler.reschedule(auto);
        let tick = a.events.recv().await.unwrap();
        a.handle_scheduler_event(tick);
        assert_eq!(a.scheduler.pending(), 0);
        // Nothing listens on port 9, so the fetch fails and re-arms the timer.
        let fetched = a.events.recv().await.unwrap();
        assert!(matches!(fetched, SchedulerEvent::Fetched { .. }));
        a.handle_scheduler_event(fetched);
        assert!(a.state().notice.is_some());
        assert_eq!(a.scheduler.pending(), 1);
    }
}
