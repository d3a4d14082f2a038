//! Top-process ranking.
//!
//! [`Ranker`] enumerates every visible process, samples CPU usage for all
//! of them in parallel over a measurement window, waits for the whole batch
//! (no partial results), then stable-sorts with a caller-supplied comparator
//! and truncates to the requested size.
//!
//! Records and sampling are split in two phases: enumeration yields a
//! [`Candidate`] pairing an unsampled [`TopProcess`] with an opaque
//! [`CpuSampler`]. The sampler is consumed during the fan-out phase and
//! never appears in the returned records.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, Users};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::collectors::process::cmd_line_of;
use crate::{Error, Result};

/// Default CPU measurement window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Default cap on concurrently running sampling tasks.
pub const DEFAULT_MAX_CONCURRENCY: usize = 128;

/// One ranked process.
///
/// `cpu_percent` is 0 until the sampling phase has run; [`Ranker::rank`]
/// never returns a record whose sample has not completed (or, with a
/// timeout configured, been given up on).
#[derive(Debug, Clone, Serialize)]
pub struct TopProcess {
    pub user: String,
    pub pid: u32,
    pub ppid: u32,
    pub status: String,
    pub cmd_line: String,
    /// Process start time, seconds since the epoch.
    pub create_time: u64,
    pub cpu_percent: f32,
    /// Resident memory in bytes, sampled at enumeration time.
    pub rss_bytes: u64,
}

/// Comparator for the ranking order.
///
/// Must be a strict weak ordering; ties keep their enumeration order
/// (ascending pid for the system source) because the sort is stable.
pub type SortFn = fn(&TopProcess, &TopProcess) -> Ordering;

/// Rank by CPU percent, descending. No secondary tiebreak.
pub fn by_cpu(a: &TopProcess, b: &TopProcess) -> Ordering {
    b.cpu_percent
        .partial_cmp(&a.cpu_percent)
        .unwrap_or(Ordering::Equal)
}

/// Rank by resident memory, descending. No secondary tiebreak.
pub fn by_memory(a: &TopProcess, b: &TopProcess) -> Ordering {
    b.rss_bytes.cmp(&a.rss_bytes)
}

/// Blocking CPU measurement capability for a single process.
pub trait CpuSampler: Send + 'static {
    /// Measure CPU usage over `window`. Blocks for the window; any failure
    /// (the process exited mid-window, the read was denied) maps to 0.
    fn cpu_percent(&mut self, window: Duration) -> f32;
}

/// An unsampled record paired with the sampler that will fill it in.
pub struct Candidate<S> {
    pub record: TopProcess,
    pub sampler: S,
}

/// Supplies ranking candidates.
///
/// Fails only when no process listing can be obtained at all; per-process
/// field failures degrade the affected field to its zero value, and
/// processes with an empty command line are not produced.
pub trait ProcessSource {
    type Sampler: CpuSampler;

    fn candidates(&self) -> Result<Vec<Candidate<Self::Sampler>>>;
}

/// Samples one pid with its own targeted refresh pair.
pub struct PidSampler {
    pid: Pid,
}

impl CpuSampler for PidSampler {
    fn cpu_percent(&mut self, window: Duration) -> f32 {
        let mut sys = System::new();
        let pids = [self.pid];
        sys.refresh_processes(ProcessesToUpdate::Some(&pids), true);
        std::thread::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        sys.refresh_processes(ProcessesToUpdate::Some(&pids), true);
        sys.process(self.pid).map(|p| p.cpu_usage()).unwrap_or(0.0)
    }
}

/// The live process table.
///
/// Candidates are yielded in ascending pid order so that equal-metric ties
/// have a defined, reproducible order under the stable sort.
pub struct SystemSource;

impl ProcessSource for SystemSource {
    type Sampler = PidSampler;

    fn candidates(&self) -> Result<Vec<Candidate<PidSampler>>> {
        let mut sys = System::new();
        // The default refresh skips cmd/user; the records need both.
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );
        if sys.processes().is_empty() {
            return Err(Error::Enumeration("no processes visible".to_string()));
        }

        let users = Users::new_with_refreshed_list();
        let mut candidates: Vec<Candidate<PidSampler>> = sys
            .processes()
            .values()
            .filter(|p| !p.cmd().is_empty())
            .map(|p| Candidate {
                record: TopProcess {
                    user: p
                        .user_id()
                        .and_then(|uid| users.get_user_by_id(uid))
                        .map(|u| u.name().to_string())
                        .unwrap_or_default(),
                    pid: p.pid().as_u32(),
                    ppid: p.parent().map(|pp| pp.as_u32()).unwrap_or(0),
                    status: p.status().to_string(),
                    cmd_line: cmd_line_of(p),
                    create_time: p.start_time(),
                    cpu_percent: 0.0,
                    rss_bytes: p.memory(),
                },
                sampler: PidSampler { pid: p.pid() },
            })
            .collect();
        candidates.sort_by_key(|c| c.record.pid);
        Ok(candidates)
    }
}

/// Produces top-N process rankings.
pub struct Ranker<S = SystemSource> {
    source: S,
    window: Duration,
    max_concurrency: usize,
    sample_timeout: Option<Duration>,
}

impl Ranker<SystemSource> {
    /// Ranker over the live process table with default settings.
    pub fn new() -> Self {
        Self::with_source(SystemSource)
    }
}

impl Default for Ranker<SystemSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ProcessSource> Ranker<S> {
    pub fn with_source(source: S) -> Self {
        Ranker {
            source,
            window: DEFAULT_WINDOW,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            sample_timeout: None,
        }
    }

    /// CPU measurement window. Each ranking call blocks at least this long.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Cap on concurrently running sampling tasks.
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// Give up on a sample after `timeout`, leaving its CPU percent at 0,
    /// instead of letting one wedged read stall the whole batch.
    pub fn sample_timeout(mut self, timeout: Duration) -> Self {
        self.sample_timeout = Some(timeout);
        self
    }

    /// Return the top `n` processes under `sort`.
    ///
    /// Launches one sampling task per process, joins them all, stable-sorts,
    /// and truncates. `n == 0` yields an empty vec; the only error is a
    /// failed enumeration.
    pub async fn rank(&self, n: usize, sort: SortFn) -> Result<Vec<TopProcess>> {
        let candidates = self.source.candidates()?;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        for (index, candidate) in candidates.into_iter().enumerate() {
            if candidate.record.cmd_line.is_empty() {
                continue;
            }
            let semaphore = Arc::clone(&semaphore);
            let window = self.window;
            let timeout = self.sample_timeout;
            tasks.spawn(async move {
                let Candidate {
                    mut record,
                    mut sampler,
                } = candidate;
                // The semaphore is never closed; an acquire failure would
                // void the concurrency cap, so make it visible if it ever
                // happens rather than swallowing it.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        debug!(pid = record.pid, "sampling uncapped: {e}");
                        None
                    }
                };
                let sample = tokio::task::spawn_blocking(move || sampler.cpu_percent(window));
                record.cpu_percent = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, sample).await {
                        Ok(joined) => joined.unwrap_or(0.0),
                        Err(_) => {
                            debug!(pid = record.pid, "cpu sample timed out");
                            0.0
                        }
                    },
                    None => sample.await.unwrap_or(0.0),
                };
                (index, record)
            });
        }

        // Full barrier: every sample completes before sorting starts.
        let mut sampled = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => sampled.push(pair),
                Err(e) => debug!("sampling task failed: {e}"),
            }
        }
        // Tasks land in completion order; restore enumeration order so the
        // stable sort keeps ties deterministic.
        sampled.sort_by_key(|(index, _)| *index);

        let mut records: Vec<TopProcess> = sampled.into_iter().map(|(_, r)| r).collect();
        records.sort_by(sort);
        records.truncate(n);
        Ok(records)
    }
}

/// Top `n` processes from the live process table with default settings.
pub async fn top_processes(n: usize, sort: SortFn) -> Result<Vec<TopProcess>> {
    Ranker::new().rank(n, sort).await
}
