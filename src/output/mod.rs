pub mod json;
pub mod pretty;
pub mod tsv;

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::engine::TickReport;
use crate::error::ProcnetError;
use crate::registry::Registry;

/// One attributed connection in the per-tick view.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    pub pid: u32,
    pub process: String,
    pub socket_id: u64,
    pub proto: String,
    pub state: String,
    pub local: String,
    pub remote: String,
}

/// Join the tick's attribution edges with the registry into renderable
/// rows, sorted by (pid, socket_id). Rows copy everything out of the
/// registry; nothing here survives as a record reference.
pub fn snapshot_rows(registry: &Registry, report: &TickReport) -> Vec<SnapshotRow> {
    let mut rows: Vec<SnapshotRow> = report
        .edges
        .iter()
        .filter_map(|edge| {
            let rec = registry.get_by_id(edge.socket_id)?;
            let tuple = rec.tuple();
            Some(SnapshotRow {
                pid: edge.pid,
                process: report.names.get(&edge.pid).cloned().unwrap_or_default(),
                socket_id: edge.socket_id,
                proto: tuple.proto.to_string(),
                state: rec.state().to_string(),
                local: format!("{}:{}", tuple.local, tuple.local_port),
                remote: format!("{}:{}", tuple.remote, tuple.remote_port),
            })
        })
        .collect();
    rows.sort_by_key(|r| (r.pid, r.socket_id));
    rows
}

/// Write one tick's attributed connections in the selected format.
pub fn write_snapshot(
    rows: &[SnapshotRow],
    format: OutputFormat,
    writer: &mut impl Write,
) -> Result<(), ProcnetError> {
    match format {
        OutputFormat::Tsv => tsv::write_tsv(rows, writer),
        OutputFormat::Json => json::write_json(rows, writer),
        OutputFormat::Pretty => pretty::write_pretty(rows, writer),
    }
}
