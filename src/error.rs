use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProcnetError {
    #[error("cannot read {}: {}", path.display(), source)]
    TableRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed line {} in {}: {}", line, path.display(), detail)]
    TableParse {
        path: PathBuf,
        line: usize,
        detail: String,
    },
    #[error("output error: {0}")]
    Output(#[source] std::io::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}
