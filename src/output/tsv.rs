use std::io::Write;

use crate::error::ProcnetError;
use crate::output::SnapshotRow;

/// Write the per-tick view as TSV: header row, then one row per attributed
/// connection. Columns: pid, process, socket_id, proto, state, local, remote.
pub fn write_tsv(rows: &[SnapshotRow], writer: &mut impl Write) -> Result<(), ProcnetError> {
    writeln!(writer, "pid\tprocess\tsocket_id\tproto\tstate\tlocal\tremote")
        .map_err(ProcnetError::Output)?;

    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.pid,
            escape_tsv(&row.process),
            row.socket_id,
            row.proto,
            row.state,
            row.local,
            row.remote,
        )
        .map_err(ProcnetError::Output)?;
    }

    Ok(())
}

/// Replace tabs and newlines so a hostile comm name cannot break the format.
fn escape_tsv(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}
