//! Native port lookup reading the kernel socket tables under /proc.
//!
//! `/proc/net/tcp` and `/proc/net/tcp6` give the inode of every socket in the
//! proxy's network namespace (the host one). Each process exposes its open
//! descriptors under `/proc/<pid>/fd`, where sockets link to `socket:[<inode>]`.
//! Reading the descriptors of other users needs root or CAP_SYS_PTRACE.
//!
//! One ephemeral port can back several connections to different peers. When
//! remote ports are configured, only sockets talking to one of them count.

use super::PortOwnerLookup;
use async_trait::async_trait;
use mesos2iam_common::ResolutionError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

pub struct ProcfsLookup {
    proc_root: PathBuf,
    timeout: Duration,
    remote_ports: Vec<u16>,
}

impl ProcfsLookup {
    pub fn new(timeout: Duration) -> Self {
        Self::with_root("/proc", timeout)
    }

    pub fn with_root(proc_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            proc_root: proc_root.into(),
            timeout,
            remote_ports: Vec::new(),
        }
    }

    /// Restricts matches to sockets connected to one of `ports`: the metadata
    /// port before the NAT rewrite, or the proxy's own port.
    pub fn with_remote_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.remote_ports = ports.into_iter().collect();
        self
    }
}

#[async_trait]
impl PortOwnerLookup for ProcfsLookup {
    async fn owner_of(&self, port: u16) -> Result<u32, ResolutionError> {
        let root = self.proc_root.clone();
        let remote_ports = self.remote_ports.clone();
        let scan =
            tokio::task::spawn_blocking(move || find_port_owner(&root, port, &remote_ports));

        match tokio::time::timeout(self.timeout, scan).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ResolutionError::ProcessLookupFailed {
                port,
                detail: format!("procfs scan aborted: {e}"),
            }),
            Err(_) => Err(ResolutionError::ProcessLookupFailed {
                port,
                detail: format!("procfs scan did not finish within {:?}", self.timeout),
            }),
        }
    }
}

fn find_port_owner(
    proc_root: &Path,
    port: u16,
    remote_ports: &[u16],
) -> Result<u32, ResolutionError> {
    let mut inodes = HashSet::new();
    for table in ["net/tcp", "net/tcp6"] {
        match std::fs::read_to_string(proc_root.join(table)) {
            Ok(content) => inodes.extend(
                parse_proc_net_tcp(&content)
                    .into_iter()
                    .filter(|socket| {
                        socket.local_port == port
                            && (remote_ports.is_empty()
                                || remote_ports.contains(&socket.remote_port))
                    })
                    .map(|socket| socket.inode),
            ),
            Err(e) => trace!("Could not read {}: {}", table, e),
        }
    }

    if inodes.is_empty() {
        return Err(ResolutionError::ProcessNotFound { port });
    }
    debug!(port, ?inodes, "socket inodes for port");

    let entries = std::fs::read_dir(proc_root).map_err(|e| ResolutionError::ProcessLookupFailed {
        port,
        detail: format!("could not list {}: {e}", proc_root.display()),
    })?;

    let mut owners = Vec::new();
    let mut denied = 0usize;

    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };

        let descriptors = match std::fs::read_dir(entry.path().join("fd")) {
            Ok(descriptors) => descriptors,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                denied += 1;
                continue;
            }
            // exited while we were looking
            Err(_) => continue,
        };

        let holds_socket = descriptors.flatten().any(|fd| {
            std::fs::read_link(fd.path())
                .ok()
                .and_then(|target| parse_socket_link(&target))
                .is_some_and(|inode| inodes.contains(&inode))
        });

        if holds_socket {
            owners.push(pid);
        }
    }

    // a socket shared after fork shows up in several processes; the newest one
    // is the one that issued the request
    match owners.into_iter().max() {
        Some(pid) => Ok(pid),
        None if denied > 0 => Err(ResolutionError::PermissionDenied {
            port,
            detail: format!("could not read descriptors of {denied} processes"),
        }),
        None => Err(ResolutionError::ProcessNotFound { port }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SocketEntry {
    pub local_port: u16,
    pub remote_port: u16,
    pub inode: u64,
}

fn port_of(address: &str) -> Option<u16> {
    let (_, port_hex) = address.rsplit_once(':')?;
    u16::from_str_radix(port_hex, 16).ok()
}

/// Every socket row of `/proc/net/tcp{,6}` that has an inode.
///
/// ```text
///   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
///    0: 0100007F:2710 0100007F:C8AF 01 00000000:00000000 00:00000000 00000000  1000        0 12345 ...
/// ```
pub(crate) fn parse_proc_net_tcp(content: &str) -> Vec<SocketEntry> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let local_port = port_of(fields.get(1)?)?;
            let remote_port = port_of(fields.get(2)?)?;
            let inode: u64 = fields.get(9)?.parse().ok()?;
            // sockets in TIME_WAIT have no inode and no owner
            (inode != 0).then_some(SocketEntry {
                local_port,
                remote_port,
                inode,
            })
        })
        .collect()
}

fn parse_socket_link(target: &Path) -> Option<u64> {
    target
        .to_str()?
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
