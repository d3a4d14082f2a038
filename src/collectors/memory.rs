use procfs::{Current, Meminfo};
use serde::Serialize;

use crate::Result;

/// Physical memory usage, all values in bytes.
#[derive(Debug, Serialize)]
pub struct VirtualMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub used_percent: f64,
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub buffers: u64,
    pub cached: u64,
    pub shared: u64,
    pub slab: u64,
    pub s_reclaimable: u64,
}

/// Read physical memory usage from /proc/meminfo.
///
/// `used` excludes buffers and page cache; `available` is the kernel's
/// MemAvailable estimate (falling back to MemFree on old kernels).
pub fn virtual_memory() -> Result<VirtualMemory> {
    let m = Meminfo::current()?;
    let used = m
        .mem_total
        .saturating_sub(m.mem_free)
        .saturating_sub(m.buffers)
        .saturating_sub(m.cached);
    let used_percent = if m.mem_total > 0 {
        used as f64 / m.mem_total as f64 * 100.0
    } else {
        0.0
    };
    Ok(VirtualMemory {
        total: m.mem_total,
        available: m.mem_available.unwrap_or(m.mem_free),
        used,
        used_percent,
        free: m.mem_free,
        active: m.active,
        inactive: m.inactive,
        buffers: m.buffers,
        cached: m.cached,
        shared: m.shmem.unwrap_or(0),
        slab: m.slab,
        s_reclaimable: m.s_reclaimable.unwrap_or(0),
    })
}

/// Swap usage and paging activity, byte values where noted.
#[derive(Debug, Serialize)]
pub struct SwapMemory {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
    /// Bytes swapped in since boot.
    pub sin: u64,
    /// Bytes swapped out since boot.
    pub sout: u64,
    /// Bytes paged in since boot.
    pub pg_in: u64,
    /// Bytes paged out since boot.
    pub pg_out: u64,
    /// Page faults since boot (count, not bytes).
    pub pg_fault: u64,
}

/// Read swap usage from /proc/meminfo and paging counters from /proc/vmstat.
///
/// Any counter missing from vmstat reads as zero.
pub fn swap_memory() -> Result<SwapMemory> {
    let m = Meminfo::current()?;
    let vm = procfs::vmstat()?;
    let page_size = procfs::page_size();

    let counter = |key: &str| vm.get(key).copied().unwrap_or(0).max(0) as u64;

    let used = m.swap_total.saturating_sub(m.swap_free);
    let used_percent = if m.swap_total > 0 {
        used as f64 / m.swap_total as f64 * 100.0
    } else {
        0.0
    };
    Ok(SwapMemory {
        total: m.swap_total,
        used,
        free: m.swap_free,
        used_percent,
        sin: counter("pswpin") * page_size,
        sout: counter("pswpout") * page_size,
        pg_in: counter("pgpgin") * page_size,
        pg_out: counter("pgpgout") * page_size,
        pg_fault: counter("pgfault"),
    })
}
