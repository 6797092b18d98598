// Attribution engine — drives one polling tick end to end:
// kernel table passes -> registry update -> sweep -> fd resolution.

use rustc_hash::FxHashMap;

use crate::error::ProcnetError;
use crate::model::{AttributionEdge, Protocol};
use crate::registry::Registry;
use crate::resolver::{self, Resolution, ScanLimits};
use crate::system::conn_table::TableReader;
use crate::system::ProcRoot;

/// Which kernel tables to scan each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolSet {
    pub tcp: bool,
    pub udp: bool,
}

impl ProtocolSet {
    pub fn all() -> Self {
        Self {
            tcp: true,
            udp: true,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Protocol> {
        [(self.tcp, Protocol::Tcp), (self.udp, Protocol::Udp)]
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, proto)| proto)
    }
}

impl Default for ProtocolSet {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub proc_root: ProcRoot,
    pub protocols: ProtocolSet,
    pub limits: ScanLimits,
}

/// Outcome of one completed tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Connections first observed this tick.
    pub created: usize,
    /// Connections re-observed this tick.
    pub refreshed: usize,
    /// Connections reclaimed by the sweep.
    pub removed: usize,
    pub edges: Vec<AttributionEdge>,
    /// Command name per attributed pid.
    pub names: FxHashMap<u32, String>,
}

/// The engine owns the registry; ticks are strictly sequential and never
/// re-entrant. A tick blocks on its file reads — there is no timeout, a
/// stuck read stalls the tick.
pub struct Engine {
    cfg: EngineConfig,
    registry: Registry,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            registry: Registry::new(),
        }
    }

    /// Read-only access for consumers. Record handles obtained here must
    /// not be retained past the next `tick` call.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one full sampling tick.
    ///
    /// A table read or parse failure aborts the tick before the sweep:
    /// upserts already applied from earlier lines of the same file remain,
    /// and the next successful tick reconciles them through the normal
    /// upsert/sweep protocol.
    pub fn tick(&mut self) -> Result<TickReport, ProcnetError> {
        let mut created = 0;
        let mut refreshed = 0;

        for proto in self.cfg.protocols.iter() {
            let path = self.cfg.proc_root.table(proto);
            let reader = TableReader::open(&path, proto)?;
            for raw in reader {
                if self.registry.upsert(&raw?) {
                    created += 1;
                } else {
                    refreshed += 1;
                }
            }
            log::debug!("{proto} pass done: {created} created, {refreshed} refreshed");
        }

        let removed = self.registry.sweep();

        let Resolution { edges, names } =
            resolver::resolve(&self.cfg.proc_root, &self.registry, self.cfg.limits);

        Ok(TickReport {
            created,
            refreshed,
            removed,
            edges,
            names,
        })
    }
}
