use std::time::Duration;

use procfs::{CpuTime, CurrentSI, KernelStats};
use serde::Serialize;
use sysinfo::System;

use crate::Result;

/// CPU usage of a single core (or the whole machine) over a window.
#[derive(Debug, Serialize)]
pub struct CpuPercent {
    pub cpu: String,
    pub percent: f32,
}

/// Measure per-core CPU usage over `window`, plus a trailing `cpu-total`
/// entry for the whole machine.
///
/// Blocks for the window (floored at sysinfo's minimum update interval):
/// usage is the delta between two refreshes.
pub fn cpu_percent(window: Duration) -> Vec<CpuPercent> {
    let mut sys = System::new();
    sys.refresh_cpu_all();
    std::thread::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
    sys.refresh_cpu_usage();

    let mut stats: Vec<CpuPercent> = sys
        .cpus()
        .iter()
        .enumerate()
        .map(|(i, cpu)| CpuPercent {
            cpu: format!("cpu-{i}"),
            percent: cpu.cpu_usage(),
        })
        .collect();
    stats.push(CpuPercent {
        cpu: "cpu-total".to_string(),
        percent: sys.global_cpu_usage(),
    });
    stats
}

/// Cumulative CPU time breakdown, in seconds since boot.
#[derive(Debug, Serialize)]
pub struct CpuTimes {
    pub cpu: String,
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub nice: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
}

impl CpuTimes {
    fn from_proc(name: String, t: &CpuTime) -> Self {
        CpuTimes {
            cpu: name,
            user: ms_to_secs(t.user_ms()),
            system: ms_to_secs(t.system_ms()),
            idle: ms_to_secs(t.idle_ms()),
            nice: ms_to_secs(t.nice_ms()),
            iowait: ms_to_secs(t.iowait_ms().unwrap_or(0)),
            irq: ms_to_secs(t.irq_ms().unwrap_or(0)),
            softirq: ms_to_secs(t.softirq_ms().unwrap_or(0)),
            steal: ms_to_secs(t.steal_ms().unwrap_or(0)),
        }
    }
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Read per-core CPU times from /proc/stat, plus a trailing `cpu-total`
/// entry for the aggregate line.
pub fn cpu_times() -> Result<Vec<CpuTimes>> {
    let stat = KernelStats::current()?;
    let mut stats: Vec<CpuTimes> = stat
        .cpu_time
        .iter()
        .enumerate()
        .map(|(i, t)| CpuTimes::from_proc(format!("cpu-{i}"), t))
        .collect();
    stats.push(CpuTimes::from_proc("cpu-total".to_string(), &stat.total));
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_percent_has_total_entry_last() {
        let stats = cpu_percent(Duration::from_millis(250));
        let last = stats.last().expect("at least one entry");
        assert_eq!(last.cpu, "cpu-total");
        // One entry per core plus the total.
        assert_eq!(stats.len(), System::new_all().cpus().len() + 1);
        for s in &stats {
            assert!(s.percent >= 0.0, "{} reported negative usage", s.cpu);
        }
    }

    #[test]
    fn test_cpu_times_total_is_cumulative() {
        let stats = cpu_times().expect("read /proc/stat");
        let total = stats.last().expect("at least the total line");
        assert_eq!(total.cpu, "cpu-total");
        // A booted machine has burned at least some user and idle time.
        assert!(total.user > 0.0);
        assert!(total.idle > 0.0);
    }
}
