use thiserror::Error;

/// Unified crate error type.
///
/// Only whole-listing failures and explicit lookups surface as errors.
/// Per-field reads on individual processes degrade to zero values and are
/// never reported through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// The process table itself could not be read.
    #[error("process enumeration failed: {0}")]
    Enumeration(String),

    /// A /proc read failed.
    #[error("procfs read failed: {0}")]
    Procfs(#[from] procfs::ProcError),

    /// statvfs on a mountpoint failed.
    #[error("statvfs failed for {path}: {source}")]
    Statvfs {
        path: String,
        #[source]
        source: nix::Error,
    },

    /// No such block device in /proc/diskstats.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// No such network interface.
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    /// No process with this pid.
    #[error("process not found: {0}")]
    ProcessNotFound(u32),

    /// Sending a signal to a process failed.
    #[error("failed to signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
