pub mod conn_table;
pub mod dir;

use std::path::{Path, PathBuf};

use crate::model::Protocol;

/// Path layout of a procfs mount.
///
/// The engine never hardcodes `/proc`: pointing this at a synthetic tree is
/// how the integration tests drive whole ticks without a real kernel.
#[derive(Clone, Debug)]
pub struct ProcRoot {
    root: PathBuf,
}

impl ProcRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The host's real procfs.
    pub fn system() -> Self {
        Self::new("/proc")
    }

    /// The root itself; its numeric entries are the live pids.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Kernel connection table for one protocol (`net/tcp`, `net/udp`).
    pub fn table(&self, proto: Protocol) -> PathBuf {
        self.root.join("net").join(proto.table_name())
    }

    /// Open file descriptor directory of one process.
    pub fn fd_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string()).join("fd")
    }

    /// Short command name of one process.
    pub fn comm(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string()).join("comm")
    }
}

impl Default for ProcRoot {
    fn default() -> Self {
        Self::system()
    }
}
