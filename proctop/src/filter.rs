//! Filtering and sorting over a process forest.
//!
//! Filtering prunes while keeping every ancestor of a match, so a deep match
//! is never orphaned. Sorting reorders the root list and every child list
//! with the same comparator. Both are pure over their input.

use std::cmp::Ordering;
use std::fmt;

use crate::tree::ProcessNode;
use crate::types::ProcessRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    None,
    Cpu,
    Mem,
    Name,
    Pid,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::None,
        SortKey::Cpu,
        SortKey::Mem,
        SortKey::Name,
        SortKey::Pid,
    ];

    /// Next key in selector order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            SortKey::None => SortKey::Cpu,
            SortKey::Cpu => SortKey::Mem,
            SortKey::Mem => SortKey::Name,
            SortKey::Name => SortKey::Pid,
            SortKey::Pid => SortKey::None,
        }
    }

    pub fn compare(self, a: &ProcessRecord, b: &ProcessRecord) -> Ordering {
        match self {
            SortKey::None => Ordering::Equal,
            SortKey::Cpu => b
                .cpu_usage
                .partial_cmp(&a.cpu_usage)
                .unwrap_or(Ordering::Equal),
            SortKey::Mem => b
                .memory_usage
                .partial_cmp(&a.memory_usage)
                .unwrap_or(Ordering::Equal),
            SortKey::Name => compare_names(&a.name, &b.name),
            SortKey::Pid => a.pid.cmp(&b.pid),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::None => "none",
            SortKey::Cpu => "cpu",
            SortKey::Mem => "mem",
            SortKey::Name => "name",
            SortKey::Pid => "pid",
        };
        f.write_str(s)
    }
}

// Case-folded first so "bash" and "Bash" sit together; raw order breaks ties.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub search: String,
    pub min_cpu: f32,
    pub min_mem: f32,
    pub sort_key: SortKey,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search: String::new(),
            min_cpu: 0.0,
            min_mem: 0.0,
            sort_key: SortKey::None,
        }
    }
}

/// A partial update merged into [`FilterCriteria`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterUpdate {
    pub search: Option<String>,
    pub min_cpu: Option<f32>,
    pub min_mem: Option<f32>,
    pub sort_key: Option<SortKey>,
}

impl FilterCriteria {
    pub fn merge(&mut self, update: FilterUpdate) {
        if let Some(search) = update.search {
            self.search = search;
        }
        if let Some(v) = update.min_cpu {
            self.min_cpu = v;
        }
        if let Some(v) = update.min_mem {
            self.min_mem = v;
        }
        if let Some(k) = update.sort_key {
            self.sort_key = k;
        }
    }

    /// Name-or-pid substring (case-insensitive) and both thresholds.
    pub fn matches(&self, p: &ProcessRecord) -> bool {
        let text_ok = if self.search.is_empty() {
            true
        } else {
            let needle = self.search.to_lowercase();
            p.name.to_lowercase().contains(&needle) || p.pid.to_string().contains(&needle)
        };
        text_ok && p.cpu_usage >= self.min_cpu && p.memory_usage >= self.min_mem
    }

    pub fn is_default(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// Prune with [`FilterCriteria::matches`], then sort unless the key is `none`.
    pub fn apply(&self, forest: Vec<ProcessNode>) -> Vec<ProcessNode> {
        let mut out = filter_tree(forest, &|p| self.matches(p));
        if self.sort_key != SortKey::None {
            sort_tree(&mut out, self.sort_key);
        }
        out
    }
}

/// Keep a node if it matches or keeps at least one surviving child.
pub fn filter_tree<P>(forest: Vec<ProcessNode>, predicate: &P) -> Vec<ProcessNode>
where
    P: Fn(&ProcessRecord) -> bool,
{
    // Post-order with an explicit stack; the bottom frame stands for the
    // root list and has no node of its own.
    struct Frame {
        node: Option<ProcessNode>,
        pending: std::vec::IntoIter<ProcessNode>,
        kept: Vec<ProcessNode>,
    }

    let mut stack = vec![Frame {
        node: None,
        pending: forest.into_iter(),
        kept: Vec::new(),
    }];
    while let Some(top) = stack.last_mut() {
        if let Some(mut child) = top.pending.next() {
            let grandchildren = std::mem::take(&mut child.children);
            stack.push(Frame {
                node: Some(child),
                pending: grandchildren.into_iter(),
                kept: Vec::new(),
            });
            continue;
        }
        let Some(done) = stack.pop() else { break };
        let Some(mut node) = done.node else {
            return done.kept;
        };
        node.children = done.kept;
        if predicate(&node.process) || !node.children.is_empty() {
            if let Some(parent) = stack.last_mut() {
                parent.kept.push(node);
            }
        }
    }
    Vec::new()
}

/// Stable in-place sort of the root list and of every child list.
pub fn sort_tree(forest: &mut [ProcessNode], key: SortKey) {
    if key == SortKey::None {
        return;
    }
    let mut lists = vec![forest];
    while let Some(list) = lists.pop() {
        list.sort_by(|a, b| key.compare(&a.process, &b.process));
        for node in list {
            lists.push(node.children.as_mut_slice());
        }
    }
}

pub fn count_nodes(forest: &[ProcessNode]) -> usize {
    let mut lists = vec![forest];
    let mut total = 0;
    while let Some(list) = lists.pop() {
        total += list.len();
        lists.extend(list.iter().map(|n| n.children.as_slice()));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build, walk};

    fn rec(pid: u32, parent: Option<u32>, name: &str, cpu: f32, mem: f32) -> ProcessRecord {
        ProcessRecord::new(pid, parent, name, cpu, mem)
    }

    fn sample() -> Vec<ProcessNode> {
        build(&[
            rec(1, None, "systemd", 0.1, 0.5),
            rec(100, Some(1), "sshd", 0.0, 0.2),
            rec(101, Some(100), "bash", 0.0, 0.1),
            rec(102, Some(101), "cargo", 45.0, 8.0),
            rec(200, Some(1), "Postgres", 12.0, 20.0),
            rec(300, None, "kthreadd", 0.0, 0.0),
        ])
    }

    fn pids(forest: &[ProcessNode]) -> Vec<u32> {
        forest.iter().map(|n| n.process.pid).collect()
    }

    fn preorder(forest: &[ProcessNode]) -> Vec<u32> {
        let mut out = Vec::new();
        walk(forest, &mut |n, _| out.push(n.process.pid));
        out
    }

    #[test]
    fn prune_keeps_ancestor_chain_of_deep_match() {
        let criteria = FilterCriteria {
            search: "cargo".into(),
            ..Default::default()
        };
        let out = filter_tree(sample(), &|p| criteria.matches(p));
        assert_eq!(preorder(&out), vec![1, 100, 101, 102]);
    }

    #[test]
    fn prune_drops_non_matching_leaves() {
        let criteria = FilterCriteria {
            min_cpu: 10.0,
            ..Default::default()
        };
        let out = filter_tree(sample(), &|p| criteria.matches(p));
        assert_eq!(preorder(&out), vec![1, 100, 101, 102, 200]);
        assert_eq!(count_nodes(&out), 5);
    }

    #[test]
    fn prune_is_subset_and_identity_for_always_true() {
        let total = count_nodes(&sample());
        let all = filter_tree(sample(), &|_| true);
        assert_eq!(count_nodes(&all), total);
        assert_eq!(all, sample());
        let none = filter_tree(sample(), &|_| false);
        assert_eq!(count_nodes(&none), 0);
        let some = filter_tree(sample(), &|p| p.memory_usage > 1.0);
        assert!(count_nodes(&some) <= total);
    }

    #[test]
    fn search_is_case_insensitive_and_matches_pid() {
        let c = FilterCriteria {
            search: "POSTGRES".into(),
            ..Default::default()
        };
        assert!(c.matches(&rec(200, None, "postgres", 0.0, 0.0)));
        let by_pid = FilterCriteria {
            search: "10".into(),
            ..Default::default()
        };
        assert!(by_pid.matches(&rec(4102, None, "x", 0.0, 0.0)));
        assert!(!by_pid.matches(&rec(42, None, "x", 0.0, 0.0)));
    }

    #[test]
    fn empty_search_matches_everything_above_thresholds() {
        let c = FilterCriteria {
            min_mem: 5.0,
            ..Default::default()
        };
        assert!(c.matches(&rec(1, None, "a", 0.0, 5.0)));
        assert!(!c.matches(&rec(1, None, "a", 99.0, 4.9)));
    }

    #[test]
    fn pid_sort_ascending() {
        let mut forest = build(&[rec(3, None, "c", 0.0, 0.0), rec(1, None, "a", 0.0, 0.0), rec(2, None, "b", 0.0, 0.0)]);
        sort_tree(&mut forest, SortKey::Pid);
        assert_eq!(pids(&forest), vec![1, 2, 3]);
    }

    #[test]
    fn none_sort_leaves_order_unchanged() {
        let mut forest = sample();
        sort_tree(&mut forest, SortKey::None);
        assert_eq!(forest, sample());
    }

    #[test]
    fn cpu_sort_descending_and_recursive() {
        let mut forest = sample();
        sort_tree(&mut forest, SortKey::Cpu);
        // Roots: systemd 0.1, kthreadd 0.0
        assert_eq!(pids(&forest), vec![1, 300]);
        // Children of systemd: Postgres 12 before sshd 0
        assert_eq!(pids(&forest[0].children), vec![200, 100]);
    }

    #[test]
    fn mem_sort_is_stable_on_ties() {
        let mut forest = build(&[
            rec(5, None, "e", 0.0, 1.0),
            rec(6, None, "f", 0.0, 2.0),
            rec(7, None, "g", 0.0, 1.0),
        ]);
        sort_tree(&mut forest, SortKey::Mem);
        assert_eq!(pids(&forest), vec![6, 5, 7]);
    }

    #[test]
    fn name_sort_folds_case() {
        let mut forest = build(&[
            rec(1, None, "zsh", 0.0, 0.0),
            rec(2, None, "Bash", 0.0, 0.0),
            rec(3, None, "apache", 0.0, 0.0),
            rec(4, None, "bash", 0.0, 0.0),
        ]);
        sort_tree(&mut forest, SortKey::Name);
        assert_eq!(pids(&forest), vec![3, 2, 4, 1]);
    }

    #[test]
    fn deep_chain_filters_sorts_and_counts() {
        const DEPTH: u32 = 100_000;
        let input: Vec<ProcessRecord> = (1..=DEPTH)
            .map(|pid| rec(pid, (pid > 1).then(|| pid - 1), "worker", 0.0, 0.0))
            .collect();
        let forest = build(&input);
        assert_eq!(count_nodes(&forest), DEPTH as usize);

        // Only the leaf matches; its whole ancestor chain survives.
        let mut kept = filter_tree(forest, &|p| p.pid == DEPTH);
        assert_eq!(count_nodes(&kept), DEPTH as usize);
        sort_tree(&mut kept, SortKey::Cpu);
        assert_eq!(preorder(&kept).last(), Some(&DEPTH));

        let none = filter_tree(kept, &|_| false);
        assert!(none.is_empty());
    }

    #[test]
    fn apply_is_idempotent() {
        let c = FilterCriteria {
            search: "s".into(),
            min_cpu: 0.0,
            min_mem: 0.1,
            sort_key: SortKey::Name,
        };
        let once = c.apply(sample());
        let twice = c.apply(sample());
        assert_eq!(once, twice);
        assert_eq!(c.apply(once.clone()), once);
    }

    #[test]
    fn merge_only_touches_given_fields() {
        let mut c = FilterCriteria::default();
        c.merge(FilterUpdate {
            min_cpu: Some(2.5),
            ..Default::default()
        });
        c.merge(FilterUpdate {
            search: Some("ssh".into()),
            sort_key: Some(SortKey::Pid),
            ..Default::default()
        });
        assert_eq!(c.min_cpu, 2.5);
        assert_eq!(c.min_mem, 0.0);
        assert_eq!(c.search, "ssh");
        assert_eq!(c.sort_key, SortKey::Pid);
        assert!(!c.is_default());
    }

    #[test]
    fn sort_key_cycles_through_all() {
        let mut k = SortKey::None;
        for expected in SortKey::ALL.iter().skip(1) {
            k = k.next();
            assert_eq!(k, *expected);
        }
        assert_eq!(k.next(), SortKey::None);
    }
}
