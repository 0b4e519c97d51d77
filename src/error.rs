// Error taxonomy for the record store and the reporting transforms

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    /// File absent at load time. Recovered with an empty canonical table.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Delimited content that does not match the canonical layout
    #[error("malformed table {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    /// Header row absent (empty file) or lacking canonical columns
    #[error("table {} has no {missing:?} column(s)", path.display())]
    MissingColumns {
        path: PathBuf,
        missing: Vec<String>,
    },

    #[error("could not parse {field} value {value:?}")]
    Parse { field: &'static str, value: String },
}

impl RecordError {
    pub fn parse(field: &'static str, value: &str) -> Self {
        RecordError::Parse {
            field,
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordError::NotFound { .. })
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
