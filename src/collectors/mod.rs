pub mod cpu;
pub mod disk;
pub mod host;
pub mod load;
pub mod memory;
pub mod network;
pub mod process;

use std::time::Duration;

use serde::Serialize;
use tracing::warn;

/// A complete telemetry snapshot of the host.
///
/// Sections backed by fallible reads are `None` when collection failed;
/// one broken subsystem never fails the whole report.
#[derive(Debug, Serialize)]
pub struct SystemReport {
    pub host: host::HostInfo,
    pub load: load::LoadAverage,
    pub cpu: Vec<cpu::CpuPercent>,
    pub cpu_times: Option<Vec<cpu::CpuTimes>>,
    pub memory: Option<memory::VirtualMemory>,
    pub swap: Option<memory::SwapMemory>,
    pub disks: Option<Vec<disk::DiskUsage>>,
    pub network: Option<Vec<network::NetIoCounters>>,
}

/// Collect all subsystems into a single report.
///
/// Blocks for `cpu_window` while the CPU usage delta is measured.
pub fn collect_all(cpu_window: Duration) -> SystemReport {
    SystemReport {
        host: host::info(),
        load: load::average(),
        cpu: cpu::cpu_percent(cpu_window),
        cpu_times: log_failure("cpu_times", cpu::cpu_times()),
        memory: log_failure("memory", memory::virtual_memory()),
        swap: log_failure("swap", memory::swap_memory()),
        disks: log_failure("disks", disk::usage_all(false)),
        network: log_failure("network", network::io_counters(None)),
    }
}

fn log_failure<T>(section: &str, result: crate::Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(section, "collection failed: {e}");
            None
        }
    }
}
