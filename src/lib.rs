//! Host and process telemetry for Linux hosts.
//!
//! Every subsystem lives in its own collector module and returns plain
//! [`serde::Serialize`] records:
//!
//! - [`collectors::cpu`] — per-core usage percentages and time breakdowns
//! - [`collectors::memory`] — virtual memory and swap
//! - [`collectors::disk`] — partitions, usage by mountpoint, device IO
//! - [`collectors::network`] — interfaces, IO counters, TCP connections
//! - [`collectors::host`] / [`collectors::load`] — system info, load average
//! - [`collectors::process`] — per-process records and signals
//!
//! The one concurrent piece is [`top`]: it enumerates processes, samples
//! CPU usage for all of them in parallel over a measurement window, then
//! returns a stable top-N ranking.
//!
//! ```no_run
//! use hoststats::top::{self, Ranker};
//!
//! # async fn demo() -> hoststats::Result<()> {
//! let busiest = Ranker::new().rank(10, top::by_cpu).await?;
//! for p in &busiest {
//!     println!("{:>7} {:>5.1}% {}", p.pid, p.cpu_percent, p.cmd_line);
//! }
//! # Ok(())
//! # }
//! ```

pub mod collectors;
mod error;
pub mod top;

pub use error::{Error, Result};

use serde::Serialize;

/// Render any serializable stat record as a JSON string.
///
/// Serialization of the plain records in this crate cannot fail; if it ever
/// does, the empty string is returned rather than panicking.
pub trait ToJson {
    fn to_json(&self) -> String;
}

impl<T: Serialize> ToJson for T {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
