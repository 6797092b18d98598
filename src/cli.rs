use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::engine::ProtocolSet;
use crate::resolver::ScanLimits;

#[derive(Parser, Debug)]
#[command(
    name = "procnet",
    version,
    about = "Attributes live network connections to the processes that own them"
)]
pub struct Cli {
    /// Seconds between sampling ticks
    #[arg(long, default_value_t = 1.0, value_parser = validate_interval)]
    pub interval: f64,

    /// Which kernel tables to scan
    #[arg(long, value_enum, default_value = "all")]
    pub proto: ProtoArg,

    /// Output format
    #[arg(long, value_enum, default_value = "tsv")]
    pub format: OutputFormat,

    /// Number of ticks to run before exiting (0 = until interrupted)
    #[arg(long, default_value_t = 0)]
    pub ticks: u64,

    /// Procfs mount to read
    #[arg(long, default_value = "/proc")]
    pub proc_root: PathBuf,

    /// Upper bound on processes scanned per tick
    #[arg(long, default_value_t = 4096, value_parser = validate_limit)]
    pub max_processes: usize,

    /// Upper bound on fds scanned per process
    #[arg(long, default_value_t = 4096, value_parser = validate_limit)]
    pub max_fds: usize,
}

impl Cli {
    pub fn limits(&self) -> ScanLimits {
        ScanLimits {
            max_processes: self.max_processes,
            max_fds: self.max_fds,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoArg {
    Tcp,
    Udp,
    All,
}

impl ProtoArg {
    pub fn to_set(self) -> ProtocolSet {
        match self {
            Self::Tcp => ProtocolSet {
                tcp: true,
                udp: false,
            },
            Self::Udp => ProtocolSet {
                tcp: false,
                udp: true,
            },
            Self::All => ProtocolSet::all(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Json,
    Pretty,
}

fn validate_interval(s: &str) -> Result<f64, String> {
    let val: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if val < 0.1 {
        Err("interval must be at least 0.1 seconds".to_string())
    } else if val > 10.0 {
        Err("interval must be at most 10.0 seconds".to_string())
    } else {
        Ok(val)
    }
}

fn validate_limit(s: &str) -> Result<usize, String> {
    let val: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val == 0 {
        Err("limit must be at least 1".to_string())
    } else if val > 1_000_000 {
        Err("limit must be at most 1000000".to_string())
    } else {
        Ok(val)
    }
}
