// Kernel connection-table reader.
//
// Each line after the header has the format:
//   sl  local_address rem_address st tx_queue:rx_queue tr:tm->when retrnsmt uid timeout inode ...
// with addresses and ports as fixed-width hex and the inode in decimal.
//
// references
// https://www.kernel.org/doc/Documentation/networking/proc_net_tcp.txt

use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::ProcnetError;
use crate::model::{ConnTuple, Protocol, SocketState};

/// One connection row as read from a kernel table, before registry insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawConnection {
    pub socket_id: u64,
    pub tuple: ConnTuple,
    pub state: SocketState,
}

/// Reader over one snapshot of a kernel connection table.
///
/// Yields each tracked connection once and cannot be restarted; open a new
/// reader next tick for a fresh snapshot. A malformed line is fatal to the
/// pass: once the expected field layout breaks, skipping ahead risks
/// misattributing whatever the parser resynchronizes on, so the reader
/// yields the error and ends.
pub struct TableReader {
    path: PathBuf,
    proto: Protocol,
    lines: std::vec::IntoIter<String>,
    line_no: usize,
    done: bool,
}

impl TableReader {
    /// Snapshot `path` and prepare to iterate its rows.
    ///
    /// Fails if the file cannot be read or lacks the header line.
    pub fn open(path: &Path, proto: Protocol) -> Result<Self, ProcnetError> {
        let content = fs::read_to_string(path).map_err(|e| ProcnetError::TableRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut lines: Vec<String> = content.lines().map(str::to_owned).collect();
        if lines.is_empty() {
            return Err(ProcnetError::TableParse {
                path: path.to_path_buf(),
                line: 1,
                detail: "missing header line".to_string(),
            });
        }
        lines.remove(0);

        Ok(Self {
            path: path.to_path_buf(),
            proto,
            lines: lines.into_iter(),
            line_no: 1,
            done: false,
        })
    }

    fn malformed(&self, detail: impl Into<String>) -> ProcnetError {
        ProcnetError::TableParse {
            path: self.path.clone(),
            line: self.line_no,
            detail: detail.into(),
        }
    }

    /// Parse one row. `Ok(None)` means the row is valid but filtered:
    /// listening sockets, TIME_WAIT leftovers, and inode-0 rows (sockets
    /// whose owner is already gone) are not part of traffic attribution.
    fn parse_line(&self, line: &str) -> Result<Option<RawConnection>, ProcnetError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            return Err(self.malformed(format!("expected at least 10 fields, got {}", fields.len())));
        }

        let (local, local_port) = parse_addr_v4(fields[1])
            .ok_or_else(|| self.malformed(format!("bad local address {:?}", fields[1])))?;
        let (remote, remote_port) = parse_addr_v4(fields[2])
            .ok_or_else(|| self.malformed(format!("bad remote address {:?}", fields[2])))?;
        let state_code = u8::from_str_radix(fields[3], 16)
            .map_err(|_| self.malformed(format!("bad state field {:?}", fields[3])))?;
        let socket_id: u64 = fields[9]
            .parse()
            .map_err(|_| self.malformed(format!("bad inode field {:?}", fields[9])))?;

        let state = SocketState::from_hex(state_code);
        if socket_id == 0 || !state.is_tracked() {
            return Ok(None);
        }

        Ok(Some(RawConnection {
            socket_id,
            tuple: ConnTuple {
                local,
                local_port,
                remote,
                remote_port,
                proto: self.proto,
            },
            state,
        }))
    }
}

impl Iterator for TableReader {
    type Item = Result<RawConnection, ProcnetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            match self.parse_line(&line) {
                Ok(Some(raw)) => return Some(Ok(raw)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Parse an address field like `0100007F:0035`.
///
/// The 8 hex chars are the IPv4 address in host byte order (little-endian on
/// x86/ARM), the port is big-endian hex.
pub fn parse_addr_v4(s: &str) -> Option<(Ipv4Addr, u16)> {
    let (addr_hex, port_hex) = s.split_once(':')?;
    if addr_hex.len() != 8 {
        return None;
    }
    let raw = u32::from_str_radix(addr_hex, 16).ok()?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    Some((Ipv4Addr::from(raw.swap_bytes()), port))
}
