//! Local process sampling with sysinfo, plus the background loop that keeps
//! this host's entry in the store fresh.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::state::Store;
use crate::types::ProcessEntry;

pub type SharedSystem = Arc<Mutex<System>>;

// Divide per-process cpu_usage by logical core count so a saturated multi-core
// process reports near 100% instead of N*100%. Disable with
// PROCTOP_AGENT_NORMALIZE_CPU=0 to keep the OS-tool scale.
fn normalize_cpu_enabled() -> bool {
    static ON: OnceCell<bool> = OnceCell::new();
    *ON.get_or_init(|| {
        std::env::var("PROCTOP_AGENT_NORMALIZE_CPU")
            .map(|v| v != "0")
            .unwrap_or(true)
    })
}

pub fn new_system() -> SharedSystem {
    let mut sys = System::new();
    // Populate the cpu list (core count) and the first cpu baseline.
    sys.refresh_cpu_usage();
    sys.refresh_memory();
    Arc::new(Mutex::new(sys))
}

/// Hostname for local reports: override, then the OS name, then sysinfo.
pub fn local_hostname(overridden: Option<&str>) -> String {
    if let Some(h) = overridden.filter(|h| !h.is_empty()) {
        return h.to_string();
    }
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .or_else(System::host_name)
        .unwrap_or_else(|| "unknown".into())
}

/// Refresh and list every process (threads excluded), sorted by pid.
pub async fn collect_processes(sys: &SharedSystem) -> Vec<ProcessEntry> {
    let mut sys = sys.lock().await;
    sys.refresh_memory();
    let kind = ProcessRefreshKind::nothing().with_cpu().with_memory();
    sys.refresh_processes_specifics(ProcessesToUpdate::All, true, kind);

    let cores = sys.cpus().len().max(1) as f32;
    let total_mem = sys.total_memory();
    let norm = normalize_cpu_enabled();

    let mut list: Vec<ProcessEntry> = sys
        .processes()
        .values()
        .filter(|p| p.thread_kind().is_none())
        .map(|p| {
            let raw = p.cpu_usage();
            let cpu = if norm {
                (raw / cores).clamp(0.0, 100.0)
            } else {
                raw.max(0.0)
            };
            ProcessEntry {
                pid: p.pid().as_u32(),
                parent_pid: p.parent().map(|pp| pp.as_u32()),
                name: p.name().to_string_lossy().into_owned(),
                cpu_usage: cpu,
                memory_usage: mem_percent(p.memory(), total_mem),
            }
        })
        .collect();
    list.sort_by_key(|p| p.pid);
    list
}

pub fn mem_percent(bytes: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (bytes as f64 / total as f64 * 100.0) as f32
    }
}

/// Sample this host every `period` and replace its entry in the store.
pub fn spawn_sampler(
    store: Store,
    sys: SharedSystem,
    hostname: String,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let processes = collect_processes(&sys).await;
            debug!(host = %hostname, count = processes.len(), "sampled processes");
            store.replace(&hostname, processes).await;
            sleep(period).await;
        }
    })
}
