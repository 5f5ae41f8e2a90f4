//! Wire types for the process inventory API.
//! Keep this module minimal and stable; it defines the wire format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
    pub cpu_usage: f32,
    /// Percent of host memory.
    pub memory_usage: f32,
}

/// One machine as served by `GET /api/processes/latest/`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MachineReport {
    pub hostname: String,
    /// RFC 3339, UTC.
    pub last_updated: String,
    pub processes: Vec<ProcessEntry>,
}

/// Body of `POST /api/processes/`. The agent stamps the time on receipt.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngestRequest {
    pub hostname: String,
    #[serde(default)]
    pub processes: Vec<ProcessEntry>,
}
