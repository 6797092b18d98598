// Process FD resolver — walks `/proc/<pid>/fd` symlinks to find which
// process owns each tracked socket.
//
// There is no kernel-provided reverse index from socket to process, so the
// cost is inherently (processes x open fds). The connection side stays O(1):
// each candidate inode is probed against the registry's socket-id index,
// never scanned against the connection list.

use std::fs;

use rustc_hash::FxHashMap;

use crate::model::AttributionEdge;
use crate::registry::Registry;
use crate::system::dir::{numeric_entries, socket_inode};
use crate::system::ProcRoot;

/// Truncation bounds for one resolution pass. Exceeding a bound shortens
/// the scan for the tick; it is capacity policy, not an error.
#[derive(Clone, Copy, Debug)]
pub struct ScanLimits {
    pub max_processes: usize,
    pub max_fds: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_processes: 4096,
            max_fds: 4096,
        }
    }
}

/// Output of one resolution pass. Both parts are rebuilt every tick and
/// hold no references into the registry.
#[derive(Debug, Default)]
pub struct Resolution {
    /// `(pid, socket_id)` pairs, at most one per resolved fd.
    pub edges: Vec<AttributionEdge>,
    /// Command name per attributed pid, read once per pid per tick.
    pub names: FxHashMap<u32, String>,
}

/// Attribute the registry's live sockets to the processes holding them open.
///
/// Processes and fds that vanish between enumeration and resolution are
/// skipped silently: churn between the two reads is expected and a socket
/// that disappeared mid-scan was not stably attributable anyway.
pub fn resolve(proc_root: &ProcRoot, registry: &Registry, limits: ScanLimits) -> Resolution {
    let mut res = Resolution::default();
    if registry.is_empty() {
        return res;
    }

    let mut pids = numeric_entries(proc_root.path());
    if pids.len() > limits.max_processes {
        log::debug!(
            "scanning {} of {} processes this tick",
            limits.max_processes,
            pids.len()
        );
        pids.truncate(limits.max_processes);
    }

    for pid in pids {
        let fd_dir = proc_root.fd_dir(pid);
        let mut fds = numeric_entries(&fd_dir);
        if fds.len() > limits.max_fds {
            log::debug!("scanning {} of {} fds for pid {pid}", limits.max_fds, fds.len());
            fds.truncate(limits.max_fds);
        }

        for fd in fds {
            let link = match fs::read_link(fd_dir.join(fd.to_string())) {
                Ok(l) => l,
                // fd closed or process exited between listing and readlink
                Err(_) => continue,
            };
            let target = link.to_string_lossy();
            let id = match socket_inode(&target) {
                Some(id) => id,
                None => continue,
            };
            if registry.get_by_id(id).is_none() {
                continue;
            }

            res.edges.push(AttributionEdge { pid, socket_id: id });
            res.names
                .entry(pid)
                .or_insert_with(|| read_comm(proc_root, pid));
        }
    }

    res
}

fn read_comm(proc_root: &ProcRoot, pid: u32) -> String {
    fs::read_to_string(proc_root.comm(pid))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnTuple, Protocol, SocketState};
    use crate::system::conn_table::RawConnection;
    use std::net::Ipv4Addr;
    use std::os::unix::fs::symlink;
    use std::path::Path;

    fn registry_with(ids: &[u64]) -> Registry {
        let mut reg = Registry::new();
        for (i, &id) in ids.iter().enumerate() {
            reg.upsert(&RawConnection {
                socket_id: id,
                tuple: ConnTuple {
                    local: Ipv4Addr::new(127, 0, 0, 1),
                    local_port: 1000 + i as u16,
                    remote: Ipv4Addr::new(10, 0, 0, 2),
                    remote_port: 443,
                    proto: Protocol::Tcp,
                },
                state: SocketState::Established,
            });
        }
        reg
    }

    fn add_process(root: &Path, pid: u32, comm: &str, fds: &[(u32, &str)]) {
        let fd_dir = root.join(pid.to_string()).join("fd");
        fs::create_dir_all(&fd_dir).unwrap();
        fs::write(root.join(pid.to_string()).join("comm"), format!("{comm}\n")).unwrap();
        for (fd, target) in fds {
            symlink(target, fd_dir.join(fd.to_string())).unwrap();
        }
    }

    #[test]
    fn matches_tracked_socket() {
        let dir = tempfile::tempdir().unwrap();
        let root = ProcRoot::new(dir.path());
        add_process(
            dir.path(),
            7,
            "curl",
            &[(3, "pipe:[777]"), (5, "socket:[44385]"), (6, "socket:[99999]")],
        );

        let reg = registry_with(&[44385]);
        let res = resolve(&root, &reg, ScanLimits::default());

        assert_eq!(
            res.edges,
            vec![AttributionEdge {
                pid: 7,
                socket_id: 44385
            }]
        );
        assert_eq!(res.names.get(&7).map(String::as_str), Some("curl"));
    }

    #[test]
    fn non_numeric_entries_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = ProcRoot::new(dir.path());
        fs::create_dir_all(dir.path().join("self")).unwrap();
        add_process(dir.path(), 12, "nginx", &[(4, "socket:[501]")]);

        let reg = registry_with(&[501]);
        let res = resolve(&root, &reg, ScanLimits::default());
        assert_eq!(res.edges.len(), 1);
        assert_eq!(res.edges[0].pid, 12);
    }

    #[test]
    fn empty_registry_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let root = ProcRoot::new(dir.path());
        add_process(dir.path(), 7, "curl", &[(5, "socket:[44385]")]);

        let reg = Registry::new();
        let res = resolve(&root, &reg, ScanLimits::default());
        assert!(res.edges.is_empty());
        assert!(res.names.is_empty());
    }

    #[test]
    fn missing_comm_yields_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = ProcRoot::new(dir.path());
        let fd_dir = dir.path().join("9").join("fd");
        fs::create_dir_all(&fd_dir).unwrap();
        symlink("socket:[600]", fd_dir.join("0")).unwrap();

        let reg = registry_with(&[600]);
        let res = resolve(&root, &reg, ScanLimits::default());
        assert_eq!(res.edges.len(), 1);
        assert_eq!(res.names.get(&9).map(String::as_str), Some(""));
    }

    #[test]
    fn process_limit_truncates_scan() {
        let dir = tempfile::tempdir().unwrap();
        let root = ProcRoot::new(dir.path());
        add_process(dir.path(), 1, "a", &[(3, "socket:[10]")]);
        add_process(dir.path(), 2, "b", &[(3, "socket:[20]")]);

        let reg = registry_with(&[10, 20]);
        let limits = ScanLimits {
            max_processes: 1,
            max_fds: 4096,
        };
        let res = resolve(&root, &reg, limits);
        assert_eq!(res.edges.len(), 1);
    }

    #[test]
    fn fd_limit_truncates_scan() {
        let dir = tempfile::tempdir().unwrap();
        let root = ProcRoot::new(dir.path());
        add_process(
            dir.path(),
            1,
            "a",
            &[(3, "socket:[10]"), (4, "socket:[20]"), (5, "socket:[30]")],
        );

        let reg = registry_with(&[10, 20, 30]);
        let limits = ScanLimits {
            max_processes: 4096,
            max_fds: 2,
        };
        let res = resolve(&root, &reg, limits);
        assert_eq!(res.edges.len(), 2);
    }
}
