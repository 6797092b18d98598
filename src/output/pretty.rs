use std::io::Write;

use crate::error::ProcnetError;
use crate::output::SnapshotRow;

/// Write the per-tick view as a human-readable table.
pub fn write_pretty(rows: &[SnapshotRow], writer: &mut impl Write) -> Result<(), ProcnetError> {
    write_pretty_inner(rows, writer).map_err(ProcnetError::Output)
}

fn write_pretty_inner(rows: &[SnapshotRow], w: &mut impl Write) -> Result<(), std::io::Error> {
    writeln!(w, "Attributed Connections")?;
    writeln!(w, "{}", "=".repeat(88))?;
    writeln!(
        w,
        "{:<8} {:<18} {:>10} {:<5} {:<13} {:<21} {:<21}",
        "PID", "PROCESS", "SOCKET", "PROTO", "STATE", "LOCAL", "REMOTE"
    )?;
    writeln!(w, "{}", "-".repeat(88))?;

    for row in rows {
        writeln!(
            w,
            "{:<8} {:<18} {:>10} {:<5} {:<13} {:<21} {:<21}",
            row.pid,
            truncate(&row.process, 18),
            row.socket_id,
            row.proto,
            row.state,
            row.local,
            row.remote,
        )?;
    }

    if rows.is_empty() {
        writeln!(w, "(no attributed connections)")?;
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
