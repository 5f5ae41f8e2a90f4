//! Application state: the cached snapshots plus everything the user selected.
//!
//! Every mutation goes through a named transition and reports an [`Effect`]
//! so the owner (the app loop) decides whether to redraw or reschedule.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::action::{Action, Effect};
use crate::filter::{FilterCriteria, FilterUpdate};
use crate::types::MachineSnapshot;

/// Interval choices offered by the `+`/`-` controls.
pub const INTERVAL_CHOICES_MS: [u64; 5] = [2_000, 5_000, 10_000, 30_000, 60_000];
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Processes,
    Resources,
}

impl Tab {
    pub fn toggle(self) -> Self {
        match self {
            Tab::Processes => Tab::Resources,
            Tab::Resources => Tab::Processes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoRefresh {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for AutoRefresh {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl AutoRefresh {
    /// Step through [`INTERVAL_CHOICES_MS`]; a custom interval snaps to the
    /// nearest choice in the requested direction.
    pub fn stepped_interval(&self, up: bool) -> u64 {
        let cur = self.interval_ms;
        if up {
            INTERVAL_CHOICES_MS
                .iter()
                .copied()
                .find(|&v| v > cur)
                .unwrap_or(INTERVAL_CHOICES_MS[INTERVAL_CHOICES_MS.len() - 1])
        } else {
            INTERVAL_CHOICES_MS
                .iter()
                .rev()
                .copied()
                .find(|&v| v < cur)
                .unwrap_or(INTERVAL_CHOICES_MS[0])
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub machines: Vec<MachineSnapshot>,
    pub selected: Option<String>,
    pub active_tab: Tab,
    pub filter: FilterCriteria,
    pub machine_search: String,
    pub auto_refresh: AutoRefresh,
    /// Pids folded in the outline for the selected machine.
    pub collapsed: HashSet<u32>,
    /// Last refresh failure, cleared by the next success.
    pub notice: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new(auto_refresh: AutoRefresh) -> Self {
        Self {
            auto_refresh,
            ..Default::default()
        }
    }

    pub fn apply(&mut self, action: Action) -> Effect {
        debug!(?action, "apply");
        match action {
            Action::SelectMachine(host) => self.select_machine(host),
            Action::SetTab(tab) => self.set_tab(tab),
            Action::UpdateFilter(update) => self.update_filter(update),
            Action::ClearFilters => self.clear_filters(),
            Action::SetAutoRefresh {
                enabled,
                interval_ms,
            } => self.set_auto_refresh(enabled, interval_ms),
            Action::SetMachineSearch(text) => self.set_machine_search(text),
            Action::ToggleNode(pid) => self.toggle_node(pid),
            Action::RefreshNow => Effect::Refresh,
            Action::Quit => Effect::Quit,
        }
    }

    pub fn select_machine(&mut self, hostname: String) -> Effect {
        if self.selected.as_deref() != Some(hostname.as_str()) {
            self.collapsed.clear();
        }
        self.selected = Some(hostname);
        Effect::Render
    }

    pub fn set_tab(&mut self, tab: Tab) -> Effect {
        if tab == self.active_tab {
            return Effect::None;
        }
        self.active_tab = tab;
        Effect::Render
    }

    pub fn update_filter(&mut self, update: FilterUpdate) -> Effect {
        self.filter.merge(update);
        Effect::Render
    }

    pub fn clear_filters(&mut self) -> Effect {
        self.filter = FilterCriteria::default();
        Effect::Render
    }

    pub fn set_auto_refresh(&mut self, enabled: bool, interval_ms: u64) -> Effect {
        let next = AutoRefresh {
            enabled,
            interval_ms: interval_ms.max(1),
        };
        // Unchanged settings keep the pending timer.
        if next == self.auto_refresh {
            return Effect::None;
        }
        self.auto_refresh = next;
        Effect::Reschedule
    }

    pub fn set_machine_search(&mut self, text: String) -> Effect {
        self.machine_search = text;
        Effect::Render
    }

    pub fn toggle_node(&mut self, pid: u32) -> Effect {
        if !self.collapsed.remove(&pid) {
            self.collapsed.insert(pid);
        }
        Effect::Render
    }

    /// Replace the cache wholesale. A selection that vanished is dropped, and
    /// with nothing selected the first machine becomes the selection.
    pub fn refresh_completed(&mut self, machines: Vec<MachineSnapshot>) -> Effect {
        self.machines = machines;
        self.notice = None;
        self.last_refresh = Some(Utc::now());

        let still_present = self
            .selected
            .as_deref()
            .is_some_and(|h| self.machines.iter().any(|m| m.hostname == h));
        if !still_present {
            if self.selected.take().is_some() {
                self.collapsed.clear();
            }
            self.selected = self.machines.first().map(|m| m.hostname.clone());
        }
        Effect::Render
    }

    /// Keep the last good snapshot and selection; only surface the failure.
    pub fn refresh_failed(&mut self, message: String) -> Effect {
        self.notice = Some(message);
        Effect::Render
    }

    pub fn selected_machine(&self) -> Option<&MachineSnapshot> {
        let host = self.selected.as_deref()?;
        self.machines.iter().find(|m| m.hostname == host)
    }

    /// Machines whose hostname contains the machine search (case-insensitive).
    pub fn visible_machines(&self) -> Vec<&MachineSnapshot> {
        let needle = self.machine_search.to_lowercase();
        self.machines
            .iter()
            .filter(|m| needle.is_empty() || m.hostname.to_lowercase().contains(&needle))
            .collect()
    }

    /// Hostname `delta` steps away from the selection within the visible list,
    /// clamped to its ends.
    pub fn neighbor_machine(&self, delta: isize) -> Option<String> {
        let visible = self.visible_machines();
        if visible.is_empty() {
            return None;
        }
        let cur = self
            .selected
            .as_deref()
            .and_then(|h| visible.iter().position(|m| m.hostname == h));
        let next = match cur {
            Some(i) => (i as isize + delta).clamp(0, visible.len() as isize - 1) as usize,
            None => 0,
        };
        Some(visible[next].hostname.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortKey;

    fn machine(host: &str) -> MachineSnapshot {
        MachineSnapshot::new(host, Utc::now(), Vec::new())
    }

    #[test]
    fn first_refresh_selects_first_machine() {
        let mut s = AppState::default();
        assert_eq!(
            s.refresh_completed(vec![machine("alpha"), machine("beta")]),
            Effect::Render
        );
        assert_eq!(s.selected.as_deref(), Some("alpha"));
        assert!(s.last_refresh.is_some());
    }

    #[test]
    fn refresh_keeps_existing_selection() {
        let mut s = AppState::default();
        s.refresh_completed(vec![machine("alpha"), machine("beta")]);
        s.select_machine("beta".into());
        s.refresh_completed(vec![machine("alpha"), machine("beta")]);
        assert_eq!(s.selected.as_deref(), Some("beta"));
    }

    #[test]
    fn vanished_selection_falls_back_to_first() {
        let mut s = AppState::default();
        s.refresh_completed(vec![machine("alpha"), machine("beta")]);
        s.select_machine("beta".into());
        s.toggle_node(7);
        s.refresh_completed(vec![machine("gamma")]);
        assert_eq!(s.selected.as_deref(), Some("gamma"));
        assert!(s.collapsed.is_empty());
        s.refresh_completed(Vec::new());
        assert_eq!(s.selected, None);
    }

    #[test]
    fn failed_refresh_leaves_cache_and_selection() {
        let mut s = AppState::default();
        s.refresh_completed(vec![machine("alpha")]);
        let before = s.machines.clone();
        s.refresh_failed("connection refused".into());
        assert_eq!(s.machines, before);
        assert_eq!(s.selected.as_deref(), Some("alpha"));
        assert_eq!(s.notice.as_deref(), Some("connection refused"));
        s.refresh_completed(vec![machine("alpha")]);
        assert_eq!(s.notice, None);
    }

    #[test]
    fn filter_transitions_merge_and_clear() {
        let mut s = AppState::default();
        s.apply(Action::UpdateFilter(FilterUpdate {
            search: Some("ssh".into()),
            ..Default::default()
        }));
        s.apply(Action::UpdateFilter(FilterUpdate {
            sort_key: Some(SortKey::Cpu),
            ..Default::default()
        }));
        assert_eq!(s.filter.search, "ssh");
        assert_eq!(s.filter.sort_key, SortKey::Cpu);
        assert_eq!(s.apply(Action::ClearFilters), Effect::Render);
        assert!(s.filter.is_default());
    }

    #[test]
    fn transitions_are_idempotent() {
        let mut s = AppState::default();
        s.refresh_completed(vec![machine("alpha"), machine("beta")]);
        s.apply(Action::SelectMachine("beta".into()));
        s.apply(Action::SetTab(Tab::Resources));
        let snapshot = (s.selected.clone(), s.active_tab, s.filter.clone());
        s.apply(Action::SelectMachine("beta".into()));
        s.apply(Action::SetTab(Tab::Resources));
        assert_eq!(snapshot, (s.selected.clone(), s.active_tab, s.filter.clone()));
    }

    #[test]
    fn reselecting_current_tab_is_a_no_op() {
        let mut s = AppState::default();
        assert_eq!(s.set_tab(Tab::Processes), Effect::None);
        assert_eq!(s.set_tab(Tab::Resources), Effect::Render);
        assert_eq!(s.apply(Action::SetTab(Tab::Resources)), Effect::None);
    }

    #[test]
    fn auto_refresh_change_requests_reschedule() {
        let mut s = AppState::default();
        assert_eq!(s.set_auto_refresh(true, DEFAULT_INTERVAL_MS), Effect::None);
        assert_eq!(s.set_auto_refresh(true, 5_000), Effect::Reschedule);
        assert_eq!(s.set_auto_refresh(false, 5_000), Effect::Reschedule);
        assert_eq!(s.set_auto_refresh(false, 0), Effect::Reschedule);
        assert_eq!(s.auto_refresh.interval_ms, 1);
    }

    #[test]
    fn interval_steps_through_choices() {
        let a = AutoRefresh {
            enabled: true,
            interval_ms: 10_000,
        };
        assert_eq!(a.stepped_interval(true), 30_000);
        assert_eq!(a.stepped_interval(false), 5_000);
        let odd = AutoRefresh {
            enabled: true,
            interval_ms: 7_000,
        };
        assert_eq!(odd.stepped_interval(true), 10_000);
        assert_eq!(odd.stepped_interval(false), 5_000);
        let top = AutoRefresh {
            enabled: true,
            interval_ms: 60_000,
        };
        assert_eq!(top.stepped_interval(true), 60_000);
    }

    #[test]
    fn machine_search_filters_and_navigates() {
        let mut s = AppState::default();
        s.refresh_completed(vec![machine("web-1"), machine("db-1"), machine("WEB-2")]);
        s.set_machine_search("web".into());
        let hosts: Vec<&str> = s.visible_machines().iter().map(|m| m.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["web-1", "WEB-2"]);
        assert_eq!(s.neighbor_machine(1).as_deref(), Some("WEB-2"));
        assert_eq!(s.neighbor_machine(-1).as_deref(), Some("web-1"));
        s.select_machine("WEB-2".into());
        assert_eq!(s.neighbor_machine(5).as_deref(), Some("WEB-2"));
    }

    #[test]
    fn selecting_other_machine_resets_collapsed() {
        let mut s = AppState::default();
        s.refresh_completed(vec![machine("alpha"), machine("beta")]);
        s.toggle_node(1);
        s.select_machine("alpha".into());
        assert!(s.collapsed.contains(&1));
        s.select_machine("beta".into());
        assert!(s.collapsed.is_empty());
    }

    #[test]
    fn toggle_node_flips() {
        let mut s = AppState::default();
        s.toggle_node(5);
        assert!(s.collapsed.contains(&5));
        s.toggle_node(5);
        assert!(!s.collapsed.contains(&5));
    }

    #[test]
    fn refresh_and_quit_actions_only_signal() {
        let mut s = AppState::default();
        assert_eq!(s.apply(Action::RefreshNow), Effect::Refresh);
        assert_eq!(s.apply(Action::Quit), Effect::Quit);
        assert!(s.machines.is_empty());
    }
}
