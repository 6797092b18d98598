//! procnet — connection discovery and process-attribution engine.
//!
//! Every sampling tick the engine re-reads the kernel's connection tables
//! (`/proc/net/tcp`, `/proc/net/udp`), reconciles them into a dual-keyed
//! connection registry whose records persist across ticks, and walks
//! `/proc/<pid>/fd` symlinks to attribute each live socket to the process
//! holding it open. Consumers get the registry's live records plus the
//! tick's `(pid, socket_id)` attribution edges; rate computation and
//! rendering sit on top of this crate.

pub mod cli;
pub mod engine;
pub mod error;
pub mod model;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod system;

pub use engine::{Engine, EngineConfig, ProtocolSet, TickReport};
pub use error::ProcnetError;
pub use registry::{ConnHandle, ConnRecord, Registry};
