use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

/// Static host identity and uptime information.
#[derive(Debug, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub uptime: u64,
    pub procs: u64,
    pub os: String,
    pub platform: String,
    pub platform_version: String,
    pub kernel_version: String,
    pub kernel_arch: String,
}

/// Collect host information.
pub fn info() -> HostInfo {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    HostInfo {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        uptime: System::uptime(),
        procs: sys.processes().len() as u64,
        os: System::name().unwrap_or_else(|| "unknown".to_string()),
        platform: System::distribution_id(),
        platform_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
        kernel_version: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
        kernel_arch: std::env::consts::ARCH.to_string(),
    }
}
