use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the sensor data pipeline. All are fatal at the point of
/// occurrence; the binary maps each to exit code 1.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("sensor data file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("the file {0} contains no data")]
    EmptyInput(PathBuf),

    #[error("missing required columns: {}", .0.join(", "))]
    SchemaMismatch(Vec<String>),

    #[error("corrupted or invalid CSV format in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no data loaded; call {expected}() first")]
    NoDataLoaded { expected: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
