//! Aggregate resource summary over a machine's unfiltered process list.

use std::cmp::Ordering;

use crate::types::ProcessRecord;

pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSummary {
    pub process_count: usize,
    pub total_cpu: f64,
    /// Sum of per-process memory percentages. Not host utilization, so it
    /// can exceed 100.
    pub total_mem: f64,
    pub top_cpu: Vec<ProcessRecord>,
    pub top_mem: Vec<ProcessRecord>,
}

impl ResourceSummary {
    pub fn from_processes(processes: &[ProcessRecord]) -> Self {
        Self {
            process_count: processes.len(),
            total_cpu: processes.iter().map(|p| p.cpu_usage as f64).sum(),
            total_mem: processes.iter().map(|p| p.memory_usage as f64).sum(),
            top_cpu: top_by(processes, |p| p.cpu_usage),
            top_mem: top_by(processes, |p| p.memory_usage),
        }
    }
}

// Stable descending sort, so ties keep list order.
fn top_by<F>(processes: &[ProcessRecord], key: F) -> Vec<ProcessRecord>
where
    F: Fn(&ProcessRecord) -> f32,
{
    let mut idxs: Vec<usize> = (0..processes.len()).collect();
    idxs.sort_by(|&a, &b| {
        key(&processes[b])
            .partial_cmp(&key(&processes[a]))
            .unwrap_or(Ordering::Equal)
    });
    idxs.into_iter()
        .take(TOP_N)
        .map(|i| processes[i].clone())
        .collect()
}
