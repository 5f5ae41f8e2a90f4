//! Pure translation of [`AppState`] into a view model the `ui` module draws.
//!
//! Nothing here touches the terminal or mutates state, so every rule about
//! what the dashboard shows is testable on plain data.

use std::collections::HashSet;

use crate::filter::{count_nodes, FilterCriteria, SortKey};
use crate::resources::ResourceSummary;
use crate::state::{AppState, Tab};
use crate::tree::{self, ProcessNode};

#[derive(Debug, Clone, PartialEq)]
pub struct MachineEntry {
    pub hostname: String,
    pub selected: bool,
    pub process_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub hostname: Option<String>,
    pub last_updated: Option<String>,
    pub process_count: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toolbar {
    pub search: String,
    pub min_cpu: f32,
    pub min_mem: f32,
    pub sort_key: SortKey,
    pub shown: usize,
    pub total: usize,
}

impl Toolbar {
    pub fn counter(&self) -> String {
        format!("Showing {} of {}", self.shown, self.total)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineRow {
    pub pid: u32,
    pub name: String,
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub depth: usize,
    /// Tree guides drawn before the name, e.g. "│  └─ ".
    pub guide: String,
    pub has_children: bool,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No machine selected, or the selection is not in the cache.
    Empty,
    Processes { toolbar: Toolbar, rows: Vec<OutlineRow> },
    Resources(ResourceSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub auto_refresh: bool,
    pub interval_ms: u64,
    pub notice: Option<String>,
    pub last_refresh: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub machines: Vec<MachineEntry>,
    pub machine_search: String,
    pub header: HeaderView,
    pub active_tab: Tab,
    pub body: Body,
    pub status: StatusView,
}

/// Filtered and sorted forest for the selected machine, with the unfiltered
/// node count. `None` when there is nothing selected.
pub fn derive_forest(state: &AppState) -> Option<(Vec<ProcessNode>, usize)> {
    let machine = state.selected_machine()?;
    let forest = tree::build(&machine.processes);
    let total = count_nodes(&forest);
    Some((state.filter.apply(forest), total))
}

impl DashboardView {
    pub fn build(state: &AppState) -> Self {
        let derived = match state.active_tab {
            Tab::Processes => derive_forest(state),
            Tab::Resources => None,
        };
        Self::compose(state, derived.as_ref().map(|(f, t)| (f.as_slice(), *t)))
    }

    /// Compose from state plus an already derived `(forest, unfiltered total)`.
    pub fn compose(state: &AppState, derived: Option<(&[ProcessNode], usize)>) -> Self {
        let machines = state
            .visible_machines()
            .into_iter()
            .map(|m| MachineEntry {
                hostname: m.hostname.clone(),
                selected: state.selected.as_deref() == Some(m.hostname.as_str()),
                process_count: m.processes.len(),
            })
            .collect();

        let selected = state.selected_machine();
        let header = HeaderView {
            hostname: state.selected.clone(),
            last_updated: selected.map(|m| {
                m.last_updated
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            }),
            process_count: selected.map(|m| m.processes.len()).unwrap_or(0),
            skipped: selected.map(|m| m.skipped).unwrap_or(0),
        };

        let body = match (selected, state.active_tab) {
            (None, _) => Body::Empty,
            (Some(m), Tab::Resources) => {
                Body::Resources(ResourceSummary::from_processes(&m.processes))
            }
            (Some(_), Tab::Processes) => {
                let empty: &[ProcessNode] = &[];
                let (forest, total) = derived.unwrap_or((empty, 0));
                Body::Processes {
                    toolbar: toolbar(&state.filter, count_nodes(forest), total),
                    rows: outline_rows(forest, &state.collapsed),
                }
            }
        };

        let status = StatusView {
            auto_refresh: state.auto_refresh.enabled,
            interval_ms: state.auto_refresh.interval_ms,
            notice: state.notice.clone(),
            last_refresh: state.last_refresh.map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string()
            }),
        };

        Self {
            machines,
            machine_search: state.machine_search.clone(),
            header,
            active_tab: state.active_tab,
            body,
            status,
        }
    }

    pub fn outline(&self) -> &[OutlineRow] {
        match &self.body {
            Body::Processes { rows, .. } => rows,
            _ => &[],
        }
    }
}

fn toolbar(filter: &FilterCriteria, shown: usize, total: usize) -> Toolbar {
    Toolbar {
        search: filter.search.clone(),
        min_cpu: filter.min_cpu,
        min_mem: filter.min_mem,
        sort_key: filter.sort_key,
        shown,
        total,
    }
}

/// Ancestor levels drawn in a guide; deeper rows keep only the nearest ones.
pub const GUIDE_LEVELS: usize = 32;

/// Flatten the forest into visible rows; children of collapsed nodes are skipped.
pub fn outline_rows(forest: &[ProcessNode], collapsed: &HashSet<u32>) -> Vec<OutlineRow> {
    let mut out = Vec::new();
    // Whether each ancestor on the current path (depth 1 and below) was
    // the last of its siblings.
    let mut lasts: Vec<bool> = Vec::new();
    let n = forest.len();
    let mut stack: Vec<(&ProcessNode, usize, bool)> = forest
        .iter()
        .enumerate()
        .rev()
        .map(|(i, node)| (node, 0, i + 1 == n))
        .collect();

    while let Some((node, depth, last)) = stack.pop() {
        lasts.truncate(depth.saturating_sub(1));
        let expanded = !collapsed.contains(&node.process.pid);
        let guide = if depth == 0 {
            String::new()
        } else {
            let skip = lasts.len().saturating_sub(GUIDE_LEVELS);
            let mut g: String = lasts[skip..]
                .iter()
                .map(|&l| if l { "   " } else { "│  " })
                .collect();
            g.push_str(if last { "└─ " } else { "├─ " });
            g
        };
        out.push(OutlineRow {
            pid: node.process.pid,
            name: node.process.name.clone(),
            cpu_usage: node.process.cpu_usage,
            memory_usage: node.process.memory_usage,
            depth,
            guide,
            has_children: !node.children.is_empty(),
            expanded,
        });
        if !expanded {
            continue;
        }
        if depth > 0 {
            lasts.push(last);
        }
        let k = node.children.len();
        stack.extend(
            node.children
                .iter()
                .enumerate()
                .rev()
                .map(|(i, child)| (child, depth + 1, i + 1 == k)),
        );
    }
    out
}
