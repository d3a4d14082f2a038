use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System, Users};

use crate::{Error, Result};

/// Descriptive snapshot of one process.
///
/// Every field is best-effort: a read that fails (exited process, missing
/// permission) leaves the field at its zero value rather than failing the
/// record.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStat {
    pub user: String,
    pub pid: u32,
    pub ppid: u32,
    pub status: String,
    pub cmd_line: String,
    pub cwd: String,
    /// Process start time, seconds since the epoch.
    pub create_time: u64,
    pub nice: i64,
}

pub(crate) fn cmd_line_of(p: &sysinfo::Process) -> String {
    p.cmd()
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn build_stat(p: &sysinfo::Process, users: &Users) -> ProcessStat {
    let pid = p.pid().as_u32();
    let user = p
        .user_id()
        .and_then(|uid| users.get_user_by_id(uid))
        .map(|u| u.name().to_string())
        .unwrap_or_default();
    let nice = procfs::process::Process::new(pid as i32)
        .and_then(|proc| proc.stat())
        .map(|stat| stat.nice)
        .unwrap_or(0);

    ProcessStat {
        user,
        pid,
        ppid: p.parent().map(|pp| pp.as_u32()).unwrap_or(0),
        status: p.status().to_string(),
        cmd_line: cmd_line_of(p),
        cwd: p
            .cwd()
            .map(|c| c.to_string_lossy().to_string())
            .unwrap_or_default(),
        create_time: p.start_time(),
        nice,
    }
}

/// List every visible process with a non-empty command line, ascending pid.
///
/// Kernel threads and already-exited processes (both surface as an empty
/// command line) are silently skipped. Fails only when no process table can
/// be read at all.
pub fn processes() -> Result<Vec<ProcessStat>> {
    let mut sys = System::new();
    // The default refresh skips cmd/user/cwd; the records need all of them.
    sys.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::everything(),
    );
    if sys.processes().is_empty() {
        return Err(Error::Enumeration("no processes visible".to_string()));
    }

    let users = Users::new_with_refreshed_list();
    let mut stats: Vec<ProcessStat> = sys
        .processes()
        .values()
        .filter(|p| !p.cmd().is_empty())
        .map(|p| build_stat(p, &users))
        .collect();
    stats.sort_by_key(|s| s.pid);
    Ok(stats)
}

/// Snapshot a single process by pid.
pub fn process(pid: u32) -> Result<ProcessStat> {
    let mut sys = System::new();
    let target = Pid::from_u32(pid);
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[target]),
        true,
        ProcessRefreshKind::everything(),
    );
    let users = Users::new_with_refreshed_list();
    sys.process(target)
        .map(|p| build_stat(p, &users))
        .ok_or(Error::ProcessNotFound(pid))
}

/// Resident memory of a process in bytes; 0 if it cannot be read.
pub fn rss_bytes(pid: u32) -> u64 {
    let mut sys = System::new();
    let target = Pid::from_u32(pid);
    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    sys.process(target).map(|p| p.memory()).unwrap_or(0)
}

/// Resident memory of a process as a share of total physical memory,
/// in percent; 0 if either read fails.
pub fn memory_percent(pid: u32) -> f32 {
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    if total == 0 {
        return 0.0;
    }
    let target = Pid::from_u32(pid);
    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    sys.process(target)
        .map(|p| p.memory() as f32 / total as f32 * 100.0)
        .unwrap_or(0.0)
}

/// Scheduler and descriptor counters of one process, zero on read failure.
#[derive(Debug, Default, Serialize)]
pub struct ProcessCounters {
    pub num_threads: i64,
    pub num_fds: u64,
    pub voluntary_ctx_switches: u64,
    pub involuntary_ctx_switches: u64,
}

/// Read thread/fd/context-switch counters from /proc/<pid>.
pub fn counters(pid: u32) -> ProcessCounters {
    let Ok(proc) = procfs::process::Process::new(pid as i32) else {
        return ProcessCounters::default();
    };
    let mut c = ProcessCounters {
        num_fds: proc.fd_count().map(|n| n as u64).unwrap_or(0),
        ..ProcessCounters::default()
    };
    if let Ok(stat) = proc.stat() {
        c.num_threads = stat.num_threads;
    }
    if let Ok(status) = proc.status() {
        c.voluntary_ctx_switches = status.voluntary_ctxt_switches.unwrap_or(0);
        c.involuntary_ctx_switches = status.nonvoluntary_ctxt_switches.unwrap_or(0);
    }
    c
}

/// Send SIGKILL to a process.
pub fn kill(pid: u32) -> Result<()> {
    signal(pid, Signal::Kill)
}

/// Send SIGTERM to a process.
pub fn terminate(pid: u32) -> Result<()> {
    signal(pid, Signal::Term)
}

fn signal(pid: u32, sig: Signal) -> Result<()> {
    let mut sys = System::new();
    let target = Pid::from_u32(pid);
    sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    let p = sys.process(target).ok_or(Error::ProcessNotFound(pid))?;
    match p.kill_with(sig) {
        Some(true) => Ok(()),
        Some(false) => Err(Error::Signal {
            pid,
            reason: format!("{sig:?} was not delivered"),
        }),
        None => Err(Error::Signal {
            pid,
            reason: format!("{sig:?} is not supported on this platform"),
        }),
    }
}
