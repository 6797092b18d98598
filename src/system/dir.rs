// Directory-scan primitives over procfs.

use std::fs;
use std::path::Path;

/// List the numeric entries of a directory: pids under the proc root, fd
/// numbers under `<pid>/fd`.
///
/// A directory that cannot be opened yields an empty list, not an error —
/// under an unprivileged uid most `fd` directories are off limits, and a
/// process may exit between being listed and being read. Both just mean
/// nothing is visible there this tick.
pub fn numeric_entries(path: &Path) -> Vec<u32> {
    let dir = match fs::read_dir(path) {
        Ok(d) => d,
        Err(e) => {
            log::debug!("cannot list {}: {e}", path.display());
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for entry in dir.flatten() {
        if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
            out.push(n);
        }
    }
    out
}

/// Extract the socket inode from an fd symlink target like `socket:[12345]`.
/// Anything else (pipes, anon inodes, regular files) is not a socket.
pub fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
