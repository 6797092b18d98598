use std::io::Write;

use crate::error::ProcnetError;
use crate::output::SnapshotRow;

/// Write the per-tick view as a pretty-printed JSON array.
pub fn write_json(rows: &[SnapshotRow], writer: &mut impl Write) -> Result<(), ProcnetError> {
    serde_json::to_writer_pretty(&mut *writer, rows)
        .map_err(|e| ProcnetError::Output(std::io::Error::other(e.to_string())))?;
    writeln!(writer).map_err(ProcnetError::Output)
}
