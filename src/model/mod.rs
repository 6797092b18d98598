use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Name of the kernel table file under `net/` for this protocol.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
        }
    }
}

/// Connection state as reported in the `st` column of the kernel tables.
///
/// State values from include/net/tcp_states.h:
///   01=ESTABLISHED, 02=SYN_SENT, 03=SYN_RECV, 04=FIN_WAIT1,
///   05=FIN_WAIT2, 06=TIME_WAIT, 07=CLOSE, 08=CLOSE_WAIT,
///   09=LAST_ACK, 0A=LISTEN, 0B=CLOSING
///
/// The UDP table reuses the same codes; unconnected UDP sockets sit at 07.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketState {
    Closed,
    Listen,
    SynSent,
    SynReceived,
    Established,
    CloseWait,
    LastAck,
    FinWait1,
    FinWait2,
    Closing,
    TimeWait,
}

impl SocketState {
    pub fn from_hex(code: u8) -> Self {
        match code {
            0x01 => Self::Established,
            0x02 => Self::SynSent,
            0x03 => Self::SynReceived,
            0x04 => Self::FinWait1,
            0x05 => Self::FinWait2,
            0x06 => Self::TimeWait,
            0x07 => Self::Closed,
            0x08 => Self::CloseWait,
            0x09 => Self::LastAck,
            0x0A => Self::Listen,
            0x0B => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Whether a socket in this state carries traffic worth attributing.
    /// Listening sockets and TIME_WAIT leftovers do not.
    pub fn is_tracked(self) -> bool {
        !matches!(self, Self::Listen | Self::TimeWait)
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Listen => write!(f, "LISTEN"),
            Self::SynSent => write!(f, "SYN_SENT"),
            Self::SynReceived => write!(f, "SYN_RECEIVED"),
            Self::Established => write!(f, "ESTABLISHED"),
            Self::CloseWait => write!(f, "CLOSE_WAIT"),
            Self::LastAck => write!(f, "LAST_ACK"),
            Self::FinWait1 => write!(f, "FIN_WAIT_1"),
            Self::FinWait2 => write!(f, "FIN_WAIT_2"),
            Self::Closing => write!(f, "CLOSING"),
            Self::TimeWait => write!(f, "TIME_WAIT"),
        }
    }
}

/// The 4-tuple identity of a connection (plus protocol).
///
/// The kernel may hand the same tuple to a new socket after the old one
/// closes, so the tuple is only a secondary key; the socket inode is the
/// authoritative identity while a socket lives.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq, Hash)]
pub struct ConnTuple {
    pub local: Ipv4Addr,
    pub local_port: u16,
    pub remote: Ipv4Addr,
    pub remote_port: u16,
    pub proto: Protocol,
}

impl fmt::Display for ConnTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} <-> {}:{}/{}",
            self.local, self.local_port, self.remote, self.remote_port, self.proto
        )
    }
}

/// Cumulative counters for one connection.
///
/// This is the opaque payload slot carried by the registry: the engine
/// creates it zeroed and preserves it across ticks, and only the consuming
/// statistics layer ever writes to it.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ConnStats {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
}

impl ConnStats {
    pub fn add_rx(&mut self, bytes: u64) {
        self.rx_bytes += bytes;
        self.rx_packets += 1;
    }

    pub fn add_tx(&mut self, bytes: u64) {
        self.tx_bytes += bytes;
        self.tx_packets += 1;
    }
}

/// Per-tick association of a process with a connection it holds open.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub struct AttributionEdge {
    pub pid: u32,
    pub socket_id: u64,
}
