use std::path::Path;

use serde::Serialize;

use crate::{Error, Result};

/// One mounted filesystem.
#[derive(Debug, Serialize)]
pub struct Partition {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub opts: Vec<String>,
}

/// List mounted filesystems from /proc/mounts.
///
/// With `all` false, only device-backed filesystems (those whose source
/// lives under /dev) are returned; with `all` true, every mount including
/// pseudo-filesystems.
pub fn partitions(all: bool) -> Result<Vec<Partition>> {
    let mounts = procfs::mounts()?;
    let stats = mounts
        .into_iter()
        .filter(|m| all || m.fs_spec.starts_with("/dev/"))
        .map(|m| {
            let mut opts: Vec<String> = m
                .fs_mntops
                .iter()
                .map(|(k, v)| match v {
                    Some(v) => format!("{k}={v}"),
                    None => k.clone(),
                })
                .collect();
            opts.sort();
            Partition {
                device: m.fs_spec,
                mountpoint: m.fs_file,
                fstype: m.fs_vfstype,
                opts,
            }
        })
        .collect();
    Ok(stats)
}

/// Space and inode usage of one mounted filesystem, byte values.
#[derive(Debug, Serialize)]
pub struct DiskUsage {
    pub path: String,
    pub fstype: String,
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
    pub inodes_total: u64,
    pub inodes_used: u64,
    pub inodes_free: u64,
    pub inodes_used_percent: f64,
}

/// Usage of the filesystem mounted at `mountpoint` (a path such as "/",
/// not a device node).
pub fn usage(mountpoint: &str) -> Result<DiskUsage> {
    let stat =
        nix::sys::statvfs::statvfs(Path::new(mountpoint)).map_err(|source| Error::Statvfs {
            path: mountpoint.to_string(),
            source,
        })?;

    let bsize = stat.fragment_size() as u64;
    let total = stat.blocks() as u64 * bsize;
    // "free" is what an unprivileged caller can still use.
    let free = stat.blocks_available() as u64 * bsize;
    let used = (stat.blocks() as u64).saturating_sub(stat.blocks_free() as u64) * bsize;
    let used_percent = if used + free > 0 {
        used as f64 / (used + free) as f64 * 100.0
    } else {
        0.0
    };

    let inodes_total = stat.files() as u64;
    let inodes_free = stat.files_free() as u64;
    let inodes_used = inodes_total.saturating_sub(inodes_free);
    let inodes_used_percent = if inodes_total > 0 {
        inodes_used as f64 / inodes_total as f64 * 100.0
    } else {
        0.0
    };

    let fstype = procfs::mounts()?
        .into_iter()
        .find(|m| m.fs_file == mountpoint)
        .map(|m| m.fs_vfstype)
        .unwrap_or_default();

    Ok(DiskUsage {
        path: mountpoint.to_string(),
        fstype,
        total,
        free,
        used,
        used_percent,
        inodes_total,
        inodes_used,
        inodes_free,
        inodes_used_percent,
    })
}

/// Usage of every mounted filesystem; `all` as in [`partitions`].
///
/// Mountpoints that cannot be statted (stale or permission-restricted
/// mounts) are skipped rather than failing the whole listing.
pub fn usage_all(all: bool) -> Result<Vec<DiskUsage>> {
    let mut stats = Vec::new();
    for p in partitions(all)? {
        match usage(&p.mountpoint) {
            Ok(u) => stats.push(u),
            Err(e) => tracing::debug!(mountpoint = %p.mountpoint, "skipping mount: {e}"),
        }
    }
    Ok(stats)
}

/// Cumulative IO counters of one block device from /proc/diskstats.
///
/// Counts are operations, bytes are sector counts scaled by the kernel's
/// fixed 512-byte sector unit, times are milliseconds.
#[derive(Debug, Serialize)]
pub struct DiskIoCounters {
    pub name: String,
    pub read_count: u64,
    pub merged_read_count: u64,
    pub write_count: u64,
    pub merged_write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_time: u64,
    pub write_time: u64,
    pub iops_in_progress: u64,
    pub io_time: u64,
    pub weighted_io: u64,
}

// /proc/diskstats sector counts are always in 512-byte units.
const SECTOR_SIZE: u64 = 512;

/// IO counters for `device` (a name such as "vda" or "vda1"; a full /dev
/// path is accepted and reduced to its basename).
pub fn io_counters(device: &str) -> Result<DiskIoCounters> {
    let name = Path::new(device)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| device.to_string());

    let stat = procfs::diskstats()?
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| Error::DeviceNotFound(name.clone()))?;

    Ok(DiskIoCounters {
        name: stat.name,
        read_count: stat.reads,
        merged_read_count: stat.merged,
        write_count: stat.writes,
        merged_write_count: stat.writes_merged,
        read_bytes: stat.sectors_read * SECTOR_SIZE,
        write_bytes: stat.sectors_written * SECTOR_SIZE,
        read_time: stat.time_reading,
        write_time: stat.time_writing,
        iops_in_progress: stat.in_progress,
        io_time: stat.time_in_progress,
        weighted_io: stat.weighted_time_in_progress,
    })
}
