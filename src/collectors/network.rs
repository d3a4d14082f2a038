use std::collections::HashMap;

use procfs::net::{tcp, tcp6, TcpNetEntry, TcpState};
use procfs::process::FDTarget;
use serde::Serialize;
use sysinfo::Networks;

use crate::{Error, Result};

/// One network interface and its addresses.
#[derive(Debug, Serialize)]
pub struct NetInterface {
    pub name: String,
    pub mac: String,
    pub addrs: Vec<String>,
}

/// List network interfaces with their MAC and `addr/prefix` addresses.
pub fn interfaces() -> Vec<NetInterface> {
    let networks = Networks::new_with_refreshed_list();
    networks
        .iter()
        .map(|(name, data)| NetInterface {
            name: name.clone(),
            mac: data.mac_address().to_string(),
            addrs: data
                .ip_networks()
                .iter()
                .map(|ip| format!("{}/{}", ip.addr, ip.prefix))
                .collect(),
        })
        .collect()
}

/// Cumulative per-interface traffic counters.
#[derive(Debug, Serialize)]
pub struct NetIoCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub err_in: u64,
    pub err_out: u64,
}

/// IO counters for all interfaces, or for a single named one.
///
/// Fails with [`Error::InterfaceNotFound`] when a name is given and no such
/// interface exists.
pub fn io_counters(interface: Option<&str>) -> Result<Vec<NetIoCounters>> {
    let networks = Networks::new_with_refreshed_list();
    let stats: Vec<NetIoCounters> = networks
        .iter()
        .map(|(name, data)| NetIoCounters {
            name: name.clone(),
            bytes_sent: data.total_transmitted(),
            bytes_recv: data.total_received(),
            packets_sent: data.total_packets_transmitted(),
            packets_recv: data.total_packets_received(),
            err_in: data.total_errors_on_received(),
            err_out: data.total_errors_on_transmitted(),
        })
        .collect();

    match interface {
        None | Some("") => Ok(stats),
        Some(name) => stats
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| vec![s])
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string())),
    }
}

/// One TCP socket from the kernel's connection table.
///
/// `name` renders "ip:port" for listeners and "ip:port->ip:port" for
/// everything else; `pid`/`fd` are 0 when the owning process could not be
/// identified (it exited, or its fd table is not readable).
#[derive(Debug, Serialize)]
pub struct TcpConnection {
    pub fd: u32,
    pub pid: i32,
    pub node: String,
    pub name: String,
    pub status: String,
}

/// List every TCP connection (v4 and v6) visible in /proc/net.
pub fn tcp_connections() -> Result<Vec<TcpConnection>> {
    connection_table(None)
}

/// List TCP connections owned by `pid`.
pub fn tcp_connections_for(pid: u32) -> Result<Vec<TcpConnection>> {
    connection_table(Some(pid))
}

fn connection_table(pid: Option<u32>) -> Result<Vec<TcpConnection>> {
    let owners = socket_owners();

    let mut entries = tcp()?;
    match tcp6() {
        Ok(v6) => entries.extend(v6),
        // Hosts with ipv6 disabled have no /proc/net/tcp6.
        Err(e) => tracing::debug!("no tcp6 table: {e}"),
    }

    let stats = entries
        .into_iter()
        .filter_map(|entry| {
            let (owner_pid, fd) = owners.get(&entry.inode).copied().unwrap_or((0, 0));
            if let Some(want) = pid {
                if owner_pid != want as i32 {
                    return None;
                }
            }
            Some(TcpConnection {
                fd,
                pid: owner_pid,
                node: "TCP".to_string(),
                name: connection_name(&entry),
                status: state_name(&entry.state).to_string(),
            })
        })
        .collect();
    Ok(stats)
}

/// Map socket inodes to their owning (pid, fd) by walking /proc/<pid>/fd.
///
/// Processes whose fd tables cannot be read (permissions, races with exit)
/// are skipped; their sockets stay unattributed.
fn socket_owners() -> HashMap<u64, (i32, u32)> {
    let mut owners = HashMap::new();
    let Ok(procs) = procfs::process::all_processes() else {
        return owners;
    };
    for proc in procs.flatten() {
        let Ok(fds) = proc.fd() else { continue };
        for fd in fds.flatten() {
            if let FDTarget::Socket(inode) = fd.target {
                owners.insert(inode, (proc.pid, fd.fd as u32));
            }
        }
    }
    owners
}

fn connection_name(entry: &TcpNetEntry) -> String {
    if matches!(entry.state, TcpState::Listen) {
        format!("{}", entry.local_address)
    } else {
        format!("{}->{}", entry.local_address, entry.remote_address)
    }
}

fn state_name(state: &TcpState) -> &'static str {
    match state {
        TcpState::Established => "ESTABLISHED",
        TcpState::SynSent => "SYN_SENT",
        TcpState::SynRecv => "SYN_RECV",
        TcpState::FinWait1 => "FIN_WAIT1",
        TcpState::FinWait2 => "FIN_WAIT2",
        TcpState::TimeWait => "TIME_WAIT",
        TcpState::Close => "CLOSE",
        TcpState::CloseWait => "CLOSE_WAIT",
        TcpState::LastAck => "LAST_ACK",
        TcpState::Listen => "LISTEN",
        TcpState::Closing => "CLOSING",
        _ => "UNKNOWN",
    }
}
