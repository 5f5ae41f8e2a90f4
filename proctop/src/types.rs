//! Types that mirror the data source's JSON schema.
//!
//! Process records are decoded leniently: a record without a usable `pid` or
//! `name` is skipped and counted in [`MachineSnapshot::skipped`] instead of
//! failing the whole batch.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
    pub cpu_usage: f32,
    pub memory_usage: f32,
}

impl ProcessRecord {
    pub fn new(
        pid: u32,
        parent_pid: Option<u32>,
        name: impl Into<String>,
        cpu_usage: f32,
        memory_usage: f32,
    ) -> Self {
        Self {
            pid,
            parent_pid,
            name: name.into(),
            cpu_usage: cpu_usage.max(0.0),
            memory_usage: memory_usage.max(0.0),
        }
    }
}

/// One machine's process table as of its last report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawMachine")]
pub struct MachineSnapshot {
    pub hostname: String,
    pub last_updated: DateTime<Utc>,
    pub processes: Vec<ProcessRecord>,
    /// Records dropped while decoding because they lacked a pid or name.
    pub skipped: usize,
}

impl MachineSnapshot {
    pub fn new(
        hostname: impl Into<String>,
        last_updated: DateTime<Utc>,
        processes: Vec<ProcessRecord>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            last_updated,
            processes,
            skipped: 0,
        }
    }
}

#[derive(Deserialize)]
struct RawMachine {
    hostname: String,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    processes: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawProcess {
    #[serde(default)]
    pid: Option<u32>,
    // Only pid and name are required; anything odd in the other fields
    // degrades to a root or to zero usage.
    #[serde(default)]
    parent_pid: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cpu_usage: Option<serde_json::Value>,
    #[serde(default)]
    memory_usage: Option<serde_json::Value>,
}

fn lenient_pid(v: Option<serde_json::Value>) -> Option<u32> {
    v.and_then(|v| v.as_i64()).and_then(|n| u32::try_from(n).ok())
}

fn lenient_usage(v: Option<serde_json::Value>) -> f32 {
    v.and_then(|v| v.as_f64()).map(|n| n as f32).unwrap_or(0.0)
}

impl RawProcess {
    fn into_record(self) -> Option<ProcessRecord> {
        Some(ProcessRecord::new(
            self.pid?,
            lenient_pid(self.parent_pid),
            self.name?,
            lenient_usage(self.cpu_usage),
            lenient_usage(self.memory_usage),
        ))
    }
}

impl From<RawMachine> for MachineSnapshot {
    fn from(raw: RawMachine) -> Self {
        let total = raw.processes.len();
        let processes: Vec<ProcessRecord> = raw
            .processes
            .into_iter()
            .filter_map(|v| serde_json::from_value::<RawProcess>(v).ok())
            .filter_map(RawProcess::into_record)
            .collect();
        Self {
            hostname: raw.hostname,
            last_updated: raw.last_updated,
            skipped: total - processes.len(),
            processes,
        }
    }
}
