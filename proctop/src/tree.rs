//! Rebuilds the parent/child process forest from a flat process list.

use std::collections::HashMap;

use crate::types::ProcessRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    pub process: ProcessRecord,
    pub children: Vec<ProcessNode>,
}

impl ProcessNode {
    pub fn new(process: ProcessRecord) -> Self {
        Self {
            process,
            children: Vec::new(),
        }
    }
}

// Tear down level by level; long parent chains would otherwise recurse once
// per level.
impl Drop for ProcessNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Build a forest from `processes`.
///
/// A record becomes a child of the record whose pid equals its `parent_pid`;
/// otherwise (no parent, dangling parent, self parent) it is a root. Children
/// and roots keep input order. Records that are only reachable through a
/// parent cycle are promoted to roots, so every record appears exactly once.
pub fn build(processes: &[ProcessRecord]) -> Vec<ProcessNode> {
    let n = processes.len();

    // Arena: pid -> first index carrying it.
    let mut index: HashMap<u32, usize> = HashMap::with_capacity(n);
    for (i, p) in processes.iter().enumerate() {
        index.entry(p.pid).or_insert(i);
    }

    let parent_of: Vec<Option<usize>> = processes
        .iter()
        .enumerate()
        .map(|(i, p)| {
            p.parent_pid
                .filter(|&ppid| ppid != p.pid)
                .and_then(|ppid| index.get(&ppid).copied())
                .filter(|&j| j != i)
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            children[*p].push(i);
        }
    }

    // Pre-order over the arena; `owned[i]` lists the children attached to `i`.
    let mut visited = vec![false; n];
    let mut owned: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);
    let mut roots = Vec::new();
    let mut stack = Vec::new();
    // Roots first, then whatever is left, which sits on a parent cycle;
    // each cycle is broken at its earliest record.
    let starts = (0..n)
        .filter(|&i| parent_of[i].is_none())
        .chain(0..n);
    for start in starts {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        roots.push(start);
        stack.push(start);
        while let Some(i) = stack.pop() {
            order.push(i);
            for &c in &children[i] {
                if !visited[c] {
                    visited[c] = true;
                    owned[i].push(c);
                }
            }
            stack.extend(owned[i].iter().rev());
        }
    }

    // Children come after their parent in `order`, so assembling in reverse
    // always finds them finished.
    let mut slots: Vec<Option<ProcessNode>> = (0..n).map(|_| None).collect();
    for &i in order.iter().rev() {
        let mut node = ProcessNode::new(processes[i].clone());
        node.children = owned[i].iter().filter_map(|&c| slots[c].take()).collect();
        slots[i] = Some(node);
    }
    roots.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Pre-order walk over a forest, passing each node with its depth.
pub fn walk<'a, F>(forest: &'a [ProcessNode], f: &mut F)
where
    F: FnMut(&'a ProcessNode, usize),
{
    let mut stack: Vec<(&'a ProcessNode, usize)> = forest.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        f(node, depth);
        stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
    }
}
